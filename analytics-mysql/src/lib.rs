use analytics_core::Dialect;

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl MySql {
    pub fn new() -> Self {
        MySql
    }
}

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    /// Backslashes are escape characters in MySQL literals unless the
    /// server runs with NO_BACKSLASH_ESCAPES, so they are doubled as well.
    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
    }

    fn text_cast(&self, value: &str) -> String {
        format!("cast({} as char)", self.quote_literal(value))
    }

    fn box_clone(&self) -> Box<dyn Dialect + Send + Sync> {
        Box::new(*self)
    }
}
