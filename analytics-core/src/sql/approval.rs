use itertools::join;

use super::Conjunction;
use crate::dialect::Dialect;
use crate::query::QueryParams;

/// Prefix of the columns holding the uid of the ancestor at a given level.
pub const LEVEL_PREFIX: &str = "uidlevel";
pub const COL_APPROVALLEVEL: &str = "approvallevel";

/// Keeps data approved at or above the required level below each of the
/// org units of the approval map:
///
/// `( (ax."uidlevel2" = 'ouA' and ax."approvallevel" <= 3) or … )`
pub fn append_approval<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    sql: &mut String,
    conj: &mut Conjunction,
    )
{
    if !params.is_data_approval() {
        return;
    }

    let approval_col = dialect.quote_alias(COL_APPROVALLEVEL);

    let units = params.data_approval_levels.iter()
        .map(|(unit, level)| {
            format!("({} = {} and {} <= {})",
                dialect.quote_alias(&level_column(unit.level)),
                dialect.quote_literal(unit.uid.as_str()),
                approval_col,
                level,
            )
        });

    sql.push_str(conj.next());
    sql.push_str(&format!("( {} )", join(units, " or ")));
}

pub fn level_column(level: u32) -> String {
    format!("{}{}", LEVEL_PREFIX, level)
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::dialect::StandardSql;
    use crate::names::{OrgUnit, Uid};

    fn ou(uid: &str, level: u32) -> OrgUnit {
        OrgUnit::new(Uid::new(uid).unwrap(), level)
    }

    #[test]
    fn test_approval_disjunction() {
        let params = QueryParams::new()
            .with_data_approval_level(ou("ImspTQPwCqd", 1), 3)
            .with_data_approval_level(ou("O6uvpzGd5pu", 2), 2);

        let mut sql = String::new();
        let mut conj = Conjunction::where_clause();
        append_approval(&StandardSql, &params, &mut sql, &mut conj);

        assert_eq!(
            sql,
            " where ( (ax.\"uidlevel1\" = 'ImspTQPwCqd' and ax.\"approvallevel\" <= 3) \
            or (ax.\"uidlevel2\" = 'O6uvpzGd5pu' and ax.\"approvallevel\" <= 2) )",
        );
    }

    #[test]
    fn test_not_requested() {
        let params = QueryParams::new()
            .with_data_approval_level(ou("ImspTQPwCqd", 1), 3)
            .with_data_approval(false);

        let mut sql = String::new();
        let mut conj = Conjunction::where_clause();
        append_approval(&StandardSql, &params, &mut sql, &mut conj);

        assert_eq!(sql, "");
        assert!(!conj.is_started());
    }

    #[test]
    fn test_level_column() {
        assert_eq!(level_column(4), "uidlevel4");
    }
}
