//! Keyword bookkeeping for a clause built from several conditions:
//! the first condition gets the clause keyword, every later one `and`.
//!
//! One `Conjunction` lives for exactly one clause of one query build.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConjunctionState {
    NotStarted,
    Started,
}

#[derive(Debug)]
pub struct Conjunction {
    keyword: &'static str,
    state: ConjunctionState,
}

impl Conjunction {
    pub fn where_clause() -> Self {
        Conjunction {
            keyword: " where ",
            state: ConjunctionState::NotStarted,
        }
    }

    pub fn having_clause() -> Self {
        Conjunction {
            keyword: " having ",
            state: ConjunctionState::NotStarted,
        }
    }

    /// Text to put in front of the next condition.
    pub fn next(&mut self) -> &'static str {
        match self.state {
            ConjunctionState::NotStarted => {
                self.state = ConjunctionState::Started;
                self.keyword
            },
            ConjunctionState::Started => " and ",
        }
    }

    pub fn state(&self) -> ConjunctionState {
        self.state
    }

    pub fn is_started(&self) -> bool {
        self.state == ConjunctionState::Started
    }
}
