use anyhow::Error;
use itertools::join;

use crate::query::{QueryParams, TableType};
use crate::sql;

/// Alias of the analytics table in generated statements.
pub const ANALYTICS_TBL_ALIAS: &str = "ax";


/// Engine specific rendering of identifiers and literals. Implementations
/// hold no state and are shared between concurrent query builds.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Quoted column or table name. Embedded quote characters are doubled.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Single quoted string literal.
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\'', "''"))
    }

    /// Comma delimited list of quoted literals, for use inside `in (...)`.
    fn literal_list(&self, values: &[&str]) -> String {
        join(values.iter().map(|v| self.quote_literal(v)), ",")
    }

    /// Column qualified by the analytics table alias.
    fn quote_alias(&self, name: &str) -> String {
        format!("{}.{}", ANALYTICS_TBL_ALIAS, self.quote_identifier(name))
    }

    /// Casts a string literal to the engine's text type.
    fn text_cast(&self, value: &str) -> String {
        format!("cast({} as text)", self.quote_literal(value))
    }

    fn box_clone(&self) -> Box<dyn Dialect + Send + Sync>;

    /// Generates the aggregate statement for the query. Validation of the
    /// query happens here; the clause appenders accept any input.
    fn generate_sql(&self, params: &QueryParams, table_type: TableType) -> Result<String, Error> {
        // standard sql implementation
        sql::standard_sql(self, params, table_type)
    }
}

impl Clone for Box<dyn Dialect + Send + Sync> {
    fn clone(&self) -> Box<dyn Dialect + Send + Sync> {
        self.box_clone()
    }
}


/// ANSI quoting, double quoted identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardSql;

impl Dialect for StandardSql {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn box_clone(&self) -> Box<dyn Dialect + Send + Sync> {
        Box::new(*self)
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(StandardSql.quote_identifier("pe"), "\"pe\"");
        assert_eq!(StandardSql.quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(StandardSql.quote_alias("uidlevel2"), "ax.\"uidlevel2\"");
    }

    #[test]
    fn test_literal_list() {
        assert_eq!(StandardSql.literal_list(&["a1", "a2"]), "'a1','a2'");
        assert_eq!(StandardSql.literal_list(&["o'brien"]), "'o''brien'");
        assert_eq!(StandardSql.literal_list(&[]), "");
    }

    #[test]
    fn test_text_cast() {
        assert_eq!(StandardSql.text_cast("202001"), "cast('202001' as text)");
    }

    #[test]
    fn test_box_clone() {
        let dialect: Box<dyn Dialect + Send + Sync> = Box::new(StandardSql);
        assert_eq!(dialect.clone().name(), "standard");
    }
}
