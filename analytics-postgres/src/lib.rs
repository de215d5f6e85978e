use analytics_core::Dialect;

/// PostgreSQL, the engine the analytics tables are usually generated in.
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Postgres {
    pub fn new() -> Self {
        Postgres
    }
}

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn text_cast(&self, value: &str) -> String {
        format!("{}::text", self.quote_literal(value))
    }

    fn box_clone(&self) -> Box<dyn Dialect + Send + Sync> {
        Box::new(*self)
    }
}
