#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("'{}' is not a valid uid; expected 11 alphanumeric characters starting with a letter", uid)]
    InvalidUid {
        uid: String,
    },

    #[error("Dimension {:?} does not follow the dim:item;item convention", param)]
    InvalidDimension {
        param: String,
    },

    #[error("'{}' is not a supported {}", value, kind)]
    UnknownEnumValue {
        kind: &'static str,
        value: String,
    },

    // the display is what ends up in the logs and in the cli output
    #[error("Illegal query: {}", reason)]
    IllegalQuery {
        reason: String,
    },
}

impl QueryError {
    pub fn illegal<S: Into<String>>(reason: S) -> Self {
        QueryError::IllegalQuery { reason: reason.into() }
    }

    pub(crate) fn unknown<S: Into<String>>(kind: &'static str, value: S) -> Self {
        QueryError::UnknownEnumValue { kind, value: value.into() }
    }
}
