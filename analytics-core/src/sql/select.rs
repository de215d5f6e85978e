use anyhow::Error;
use itertools::join;

use super::Conjunction;
use crate::dialect::Dialect;
use crate::names::Dimension;
use crate::query::{AggregationType, DataType, QueryParams};

/// Comma separated quoted columns of the non-fixed dimensions.
pub fn quoted_columns<D: Dialect + ?Sized>(dialect: &D, dimensions: &[Dimension]) -> String {
    join(
        dimensions.iter()
            .filter(|d| !d.fixed)
            .map(|d| dialect.quote_alias(d.column_name())),
        ",",
    )
}

pub fn select_clause<D: Dialect + ?Sized>(dialect: &D, params: &QueryParams) -> Result<String, Error> {
    let value = if params.is_data_type(DataType::Text) {
        dialect.quote_alias(&params.value_column)
    } else {
        // numeric and boolean
        numeric_value_column(dialect, params)?
    };

    let cols = quoted_columns(dialect, &params.dimensions);

    if cols.is_empty() {
        Ok(format!("select {} as value", value))
    } else {
        Ok(format!("select {}, {} as value", cols, value))
    }
}

/// Aggregate expression over the value column.
pub fn numeric_value_column<D: Dialect + ?Sized>(dialect: &D, params: &QueryParams) -> Result<String, Error> {
    let agg = &params.aggregation_type;
    let value_column = dialect.quote_alias(&params.value_column);

    let sql = if agg.is_aggregation_type(AggregationType::Sum)
        && agg.is_period_aggregation_type(AggregationType::Average)
        && agg.is_numeric_data_type()
    {
        format!("sum(daysxvalue) / {}", params.days_for_avg_sum_int_aggregation()?)
    } else if agg.is_aggregation_type(AggregationType::Average) && agg.is_numeric_data_type() {
        format!("avg({})", value_column)
    } else if agg.is_aggregation_type(AggregationType::Average) && agg.is_boolean_data_type() {
        "sum(daysxvalue) / sum(daysno) * 100".to_owned()
    } else {
        match agg.aggregation_type {
            AggregationType::Count => format!("count({})", value_column),
            AggregationType::Stddev => format!("stddev({})", value_column),
            AggregationType::Variance => format!("variance({})", value_column),
            AggregationType::Min => format!("min({})", value_column),
            AggregationType::Max => format!("max({})", value_column),
            AggregationType::None => value_column,
            // sum and everything without a dedicated function
            _ => format!("sum({})", value_column),
        }
    };

    Ok(sql)
}

pub fn group_by_clause<D: Dialect + ?Sized>(dialect: &D, params: &QueryParams) -> String {
    let cols = quoted_columns(dialect, &params.dimensions);

    if params.is_aggregation() && !cols.is_empty() {
        format!(" group by {}", cols)
    } else {
        "".to_owned()
    }
}

/// Measure criteria restrict the aggregated value, so they go into the
/// having clause. Only numeric values can be compared.
pub fn having_clause<D: Dialect + ?Sized>(dialect: &D, params: &QueryParams) -> Result<String, Error> {
    if !params.has_measure_criteria() || !params.is_data_type(DataType::Numeric) {
        return Ok("".to_owned());
    }

    let value = numeric_value_column(dialect, params)?;
    let mut conj = Conjunction::having_clause();
    let mut sql = String::new();

    for (filter, criterion) in &params.measure_criteria {
        sql.push_str(conj.next());
        sql.push_str(&format!("{} {} {}", value, filter.sql_string(), criterion));
    }

    Ok(sql)
}
