mod approval;
mod conjunction;
mod dimensions;
mod filters;
mod from;
mod restrictions;
mod select;

use anyhow::{ensure, Error};
use chrono::NaiveDate;
use log::*;

use crate::dialect::Dialect;
use crate::error::QueryError;
use crate::names::is_valid_identifier;
use crate::query::{QueryParams, TableType};

pub use self::approval::{append_approval, level_column, COL_APPROVALLEVEL, LEVEL_PREFIX};
pub use self::conjunction::{Conjunction, ConjunctionState};
pub use self::dimensions::append_dimensions;
pub use self::filters::append_filters;
pub use self::from::{from_clause, partition_name, source_clause};
pub use self::restrictions::{append_restrictions, RestrictionStep, RESTRICTION_STEPS};
pub use self::select::{group_by_clause, having_clause, numeric_value_column, select_clause};

/// Date format of date literals, `yyyy-mm-dd`.
pub fn medium_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Error checking is done before this point. The where clause accepts any
/// input and starts with ` where ` unless nothing restricts the query.
pub fn where_clause<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    table_type: TableType,
    ) -> String
{
    let mut sql = String::new();
    let mut conj = Conjunction::where_clause();

    append_dimensions(dialect, params, &mut sql, &mut conj);
    append_filters(dialect, params, &mut sql, &mut conj);
    append_restrictions(dialect, params, table_type, &mut sql, &mut conj);
    append_approval(dialect, params, &mut sql, &mut conj);

    sql
}

pub fn validate_query(params: &QueryParams) -> Result<(), Error> {
    ensure!(
        !params.dimensions.is_empty(),
        QueryError::illegal("at least one dimension must be specified")
    );

    if params.aggregation_type.is_first_or_last_period_aggregation_type() {
        ensure!(
            params.periods().len() <= 1,
            QueryError::illegal("first and last value aggregation accepts at most one period")
        );
    }

    ensure!(
        !params.start_date_after_end_date(),
        QueryError::illegal("start date is after end date")
    );

    ensure!(
        params.has_finite_measure_criteria(),
        QueryError::illegal("measure criteria must be finite numbers")
    );

    ensure!(
        is_valid_identifier(&params.value_column),
        QueryError::illegal(format!("value column {:?} is not a valid column name", params.value_column))
    );

    if let Some(table_name) = &params.table_name {
        ensure!(
            is_valid_identifier(table_name),
            QueryError::illegal(format!("table {:?} is not a valid table name", table_name))
        );
    }

    Ok(())
}

/// Aggregate statement: select, from, where, group by and having.
pub fn standard_sql<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    table_type: TableType,
    ) -> Result<String, Error>
{
    validate_query(params)?;

    let mut sql = select_clause(dialect, params)?;
    sql.push_str(&from_clause(dialect, params, table_type)?);
    sql.push_str(&where_clause(dialect, params, table_type));
    sql.push_str(&group_by_clause(dialect, params));
    sql.push_str(&having_clause(dialect, params)?);

    debug!("{} sql: {}", dialect.name(), sql);

    Ok(sql)
}
