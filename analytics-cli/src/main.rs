//! analytics-sql prints the sql analytics-core generates for a query.
//!
//! The query is described in a JSON file (see `query_config`), the engine
//! is picked from a database url or name (see `db_config`). Nothing is
//! executed; the statement, or only its where clause, goes to stdout so it
//! can be inspected or piped into a database client.

mod db_config;
mod query_config;

use anyhow::{format_err, Error};
use dotenv::dotenv;
use log::*;
use std::env;
use structopt::StructOpt;

use analytics_core::{sql, TableType};

fn main() -> Result<(), Error> {
    // Configuration

    pretty_env_logger::init();
    dotenv().ok();
    let opt = Opt::from_args();

    // debug is boolean, but env var is Result.
    // cli opt overrides env var if env_var is false
    let env_var_debug = env::var("ANALYTICS_DEBUG")
        .map_err(|_| format_err!(""))
        .and_then(|d| {
             d.parse::<bool>()
            .map_err(|_| format_err!("could not parse bool from env_var ANALYTICS_DEBUG"))
        });
    let debug = if !opt.debug {
        env_var_debug.unwrap_or(opt.debug)
    } else {
        opt.debug // true
    };

    // Query
    let query_path = opt.query
        .or_else(|| env::var("ANALYTICS_QUERY_FILEPATH").ok())
        .ok_or_else(|| format_err!("query file not found; either ANALYTICS_QUERY_FILEPATH or cli option required"))?;

    let params = query_config::read_query(&query_path)?;

    // Database
    let db = opt.database.or_else(|| env::var("ANALYTICS_DATABASE_URL").ok());
    let (dialect, db_url, db_type) = db_config::get_dialect(db.as_ref().map(|s| s.as_str()))?;

    info!("Analytics database: {} {}", db_type, db_url);
    info!("Analytics table:    {}", opt.table_type);

    if debug {
        info!("Analytics query: {:?}", params);
    }

    let sql = if opt.where_only {
        sql::where_clause(dialect.as_ref(), &params, opt.table_type)
    } else {
        dialect.generate_sql(&params, opt.table_type)?
    };

    println!("{}", sql.trim_start());

    Ok(())
}


/// CLI arguments helper.
#[derive(Debug, StructOpt)]
#[structopt(name="analytics-sql")]
struct Opt {
    #[structopt(short="q", long="query")]
    query: Option<String>,

    #[structopt(long="db")]
    database: Option<String>,

    #[structopt(long="table-type", default_value="data-value")]
    table_type: TableType,

    #[structopt(long="where-only")]
    where_only: bool,

    #[structopt(long="debug")]
    debug: bool,
}
