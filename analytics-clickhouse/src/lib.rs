use analytics_core::Dialect;

/// ClickHouse. Identifiers are quoted with backticks and string literals use
/// backslash escapes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Clickhouse;

impl Clickhouse {
    pub fn new() -> Self {
        Clickhouse
    }
}

impl Dialect for Clickhouse {
    fn name(&self) -> &'static str {
        "clickhouse"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", escape(name, '`'))
    }

    fn quote_literal(&self, value: &str) -> String {
        format!("'{}'", escape(value, '\''))
    }

    fn text_cast(&self, value: &str) -> String {
        format!("toString({})", self.quote_literal(value))
    }

    fn box_clone(&self) -> Box<dyn Dialect + Send + Sync> {
        Box::new(*self)
    }
}

// backslash first, so the escapes added for the quote survive
fn escape(s: &str, quote: char) -> String {
    let mut res = String::with_capacity(s.len());

    for c in s.chars() {
        if c == '\\' || c == quote {
            res.push('\\');
        }
        res.push(c);
    }

    res
}
