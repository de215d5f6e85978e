use anyhow::Error;
use chrono::NaiveDate;
use itertools::{join, Itertools};

use super::approval::{level_column, COL_APPROVALLEVEL};
use super::{medium_date, Conjunction};
use crate::dialect::{Dialect, ANALYTICS_TBL_ALIAS};
use crate::error::QueryError;
use crate::names::{
    DimensionType,
    ATTRIBUTEOPTIONCOMBO_DIM_ID,
    CATEGORYOPTIONCOMBO_DIM_ID,
    DATA_X_DIM_ID,
    ORGUNIT_DIM_ID,
};
use crate::query::{DataType, QueryParams, TableType};

/// Columns every ranked sub query carries, in addition to the dimensions.
const FIRST_LAST_BASE_COLUMNS: [&str; 8] = [
    "year",
    "pestartdate",
    "peenddate",
    "oulevel",
    "daysxvalue",
    "daysno",
    "value",
    "textvalue",
];

/// Alias of each partition in a union of partitions.
const PARTITION_ALIAS: &str = "ap";

pub fn from_clause<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    table_type: TableType,
    ) -> Result<String, Error>
{
    let agg = &params.aggregation_type;

    let source = if agg.is_first_or_last_period_aggregation_type() {
        let latest = latest_end_date(params)?;
        let earliest = params.first_or_last_value_earliest_date(latest);

        first_or_last_value_subquery(dialect, params, table_type, earliest, latest)
    } else if params.has_pre_aggregate_measure_criteria() && params.is_data_type(DataType::Numeric) {
        pre_measure_criteria_subquery(dialect, params, table_type)
    } else if agg.is_last_in_period_aggregation_type() {
        let latest = latest_end_date(params)?;
        let earliest = params.earliest_start_date()
            .ok_or_else(|| QueryError::illegal("last in period aggregation requires a start date"))?;

        first_or_last_value_subquery(dialect, params, table_type, earliest, latest)
    } else {
        source_clause(dialect, params, table_type)
    };

    Ok(format!(" from {} as {}", source, ANALYTICS_TBL_ALIAS))
}

fn latest_end_date(params: &QueryParams) -> Result<NaiveDate, Error> {
    params.latest_end_date()
        .ok_or_else(|| QueryError::illegal("period aggregation requires a period or an end date").into())
}

/// Table name of a year partition.
pub fn partition_name(table: &str, year: i32) -> String {
    format!("{}_{}", table, year)
}

/// The table of the table type, a single partition of it, or the union of
/// several partitions.
pub fn source_clause<D: Dialect + ?Sized>(dialect: &D, params: &QueryParams, table_type: TableType) -> String {
    let table = params.table_name(table_type);

    if params.skip_partitioning || !params.partitions.has_any() {
        return dialect.quote_identifier(table);
    }

    if params.partitions.has_one() {
        if let Some(year) = params.partitions.any() {
            return dialect.quote_identifier(&partition_name(table, year));
        }
    }

    let selects = params.partitions.years()
        .map(|year| {
            format!("select {}.* from {} as {}",
                PARTITION_ALIAS,
                dialect.quote_identifier(&partition_name(table, *year)),
                PARTITION_ALIAS,
            )
        });

    format!("({})", join(selects, " union all "))
}

/// Ranks the values of each data, org unit and option combination by
/// period, latest first, or earliest first for first value aggregation.
/// The period dimension collapses to the latest period of the query.
fn first_or_last_value_subquery<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    table_type: TableType,
    earliest: NaiveDate,
    latest: NaiveDate,
    ) -> String
{
    let order = if params.aggregation_type.is_first_period_aggregation_type() {
        "asc"
    } else {
        "desc"
    };

    let partition_by = join(
        [DATA_X_DIM_ID, ORGUNIT_DIM_ID, CATEGORYOPTIONCOMBO_DIM_ID, ATTRIBUTEOPTIONCOMBO_DIM_ID]
            .iter()
            .map(|col| dialect.quote_alias(col)),
        ",",
    );

    format!("(select {cols},row_number() over (partition by {partition_by} \
        order by {peenddate} {order}, {pestartdate} {order}) as pe_rank \
        from {source} as {alias} \
        where {pestartdate} >= '{earliest}' and {pestartdate} <= '{latest}' \
        and ({value} is not null or {textvalue} is not null))",
        cols = join(first_or_last_value_columns(dialect, params), ","),
        partition_by = partition_by,
        peenddate = dialect.quote_alias("peenddate"),
        pestartdate = dialect.quote_alias("pestartdate"),
        order = order,
        source = source_clause(dialect, params, table_type),
        alias = ANALYTICS_TBL_ALIAS,
        earliest = medium_date(&earliest),
        latest = medium_date(&latest),
        value = dialect.quote_alias("value"),
        textvalue = dialect.quote_alias("textvalue"),
    )
}

fn first_or_last_value_columns<D: Dialect + ?Sized>(dialect: &D, params: &QueryParams) -> Vec<String> {
    let mut cols: Vec<String> = FIRST_LAST_BASE_COLUMNS.iter()
        .map(|col| dialect.quote_alias(col))
        .collect();

    if params.is_data_approval() {
        cols.push(dialect.quote_alias(COL_APPROVALLEVEL));

        let levels = params.data_approval_levels.keys()
            .map(|unit| unit.level)
            .unique();

        for level in levels {
            cols.push(dialect.quote_alias(&level_column(level)));
        }
    }

    let latest_period = params.latest_period().map(|p| p.id.clone());

    for dim in params.dimensions_and_filters() {
        let col = match (&dim.dimension_type, &latest_period) {
            (DimensionType::Period, Some(iso)) => {
                format!("{} as {}", dialect.text_cast(iso), dialect.quote_identifier(dim.column_name()))
            },
            _ => dialect.quote_alias(dim.column_name()),
        };

        cols.push(col);
    }

    cols.into_iter().unique().collect()
}

/// Applies the pre aggregate measure criteria to the individual values
/// before they are aggregated.
fn pre_measure_criteria_subquery<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    table_type: TableType,
    ) -> String
{
    let mut conj = Conjunction::where_clause();
    let mut sql = format!("(select * from {} as {}", source_clause(dialect, params, table_type), ANALYTICS_TBL_ALIAS);

    let value = dialect.quote_alias(&params.value_column);

    for (filter, criterion) in &params.pre_aggregate_measure_criteria {
        sql.push_str(conj.next());
        sql.push_str(&format!("{} {} {}", value, filter.sql_string(), criterion));
    }

    sql.push(')');
    sql
}


#[cfg(test)]
mod test {
    use super::*;
    use crate::dialect::StandardSql;
    use crate::names::{OrgUnit, Uid};
    use crate::query::{AggregationType, AnalyticsAggregationType, MeasureFilter};

    #[test]
    fn test_plain_table() {
        let params = QueryParams::new();
        assert_eq!(from_clause(&StandardSql, &params, TableType::DataValue).unwrap(), " from \"analytics\" as ax");
    }

    #[test]
    fn test_partitions() {
        let params = QueryParams::new().with_partitions(vec![2020]);
        assert_eq!(source_clause(&StandardSql, &params, TableType::DataValue), "\"analytics_2020\"");

        let params = QueryParams::new().with_partitions(vec![2020, 2019]);
        assert_eq!(
            source_clause(&StandardSql, &params, TableType::DataValue),
            "(select ap.* from \"analytics_2019\" as ap union all select ap.* from \"analytics_2020\" as ap)",
        );

        let params = params.with_skip_partitioning(true);
        assert_eq!(source_clause(&StandardSql, &params, TableType::DataValue), "\"analytics\"");
    }

    #[test]
    fn test_pre_measure_criteria() {
        let params = QueryParams::new()
            .with_pre_aggregate_measure_criteria(MeasureFilter::Gt, 5.0)
            .with_pre_aggregate_measure_criteria(MeasureFilter::Lt, 100.0);

        assert_eq!(
            from_clause(&StandardSql, &params, TableType::DataValue).unwrap(),
            " from (select * from \"analytics\" as ax where ax.\"value\" > 5 and ax.\"value\" < 100) as ax",
        );
    }

    #[test]
    fn test_last_value_subquery() {
        let params = QueryParams::new()
            .with_dimension("dx:fbfJHSPpUQD".parse().unwrap())
            .with_dimension("pe:2020".parse().unwrap())
            .with_aggregation_type(AnalyticsAggregationType::new(AggregationType::Sum, AggregationType::Last));

        assert_eq!(
            from_clause(&StandardSql, &params, TableType::DataValue).unwrap(),
            " from (select ax.\"year\",ax.\"pestartdate\",ax.\"peenddate\",ax.\"oulevel\",\
            ax.\"daysxvalue\",ax.\"daysno\",ax.\"value\",ax.\"textvalue\",ax.\"dx\",\
            cast('2020' as text) as \"pe\",\
            row_number() over (partition by ax.\"dx\",ax.\"ou\",ax.\"co\",ax.\"ao\" \
            order by ax.\"peenddate\" desc, ax.\"pestartdate\" desc) as pe_rank \
            from \"analytics\" as ax \
            where ax.\"pestartdate\" >= '2010-12-31' and ax.\"pestartdate\" <= '2020-12-31' \
            and (ax.\"value\" is not null or ax.\"textvalue\" is not null)) as ax",
        );
    }

    #[test]
    fn test_first_value_orders_ascending() {
        let params = QueryParams::new()
            .with_dimension("pe:2020".parse().unwrap())
            .with_aggregation_type(AnalyticsAggregationType::new(AggregationType::Sum, AggregationType::First));

        let sql = from_clause(&StandardSql, &params, TableType::DataValue).unwrap();
        assert!(sql.contains("order by ax.\"peenddate\" asc, ax.\"pestartdate\" asc"));
    }

    #[test]
    fn test_last_in_period_uses_earliest_start() {
        let params = QueryParams::new()
            .with_filter("pe:202001;202003".parse().unwrap())
            .with_aggregation_type(AnalyticsAggregationType::new(AggregationType::Sum, AggregationType::LastInPeriod));

        let sql = from_clause(&StandardSql, &params, TableType::DataValue).unwrap();
        assert!(sql.contains("ax.\"pestartdate\" >= '2020-01-01' and ax.\"pestartdate\" <= '2020-03-31'"));
    }

    #[test]
    fn test_subquery_approval_columns() {
        let params = QueryParams::new()
            .with_dimension("pe:2020".parse().unwrap())
            .with_aggregation_type(AnalyticsAggregationType::new(AggregationType::Sum, AggregationType::Last))
            .with_data_approval_level(OrgUnit::new(Uid::new("ImspTQPwCqd").unwrap(), 2), 1)
            .with_data_approval_level(OrgUnit::new(Uid::new("O6uvpzGd5pu").unwrap(), 2), 3);

        let sql = from_clause(&StandardSql, &params, TableType::DataValue).unwrap();
        assert!(sql.contains("ax.\"textvalue\",ax.\"approvallevel\",ax.\"uidlevel2\",cast("));
    }

    #[test]
    fn test_last_value_without_dates() {
        let params = QueryParams::new()
            .with_aggregation_type(AnalyticsAggregationType::new(AggregationType::Sum, AggregationType::Last));

        assert!(from_clause(&StandardSql, &params, TableType::DataValue).is_err());
    }

    #[test]
    fn test_table_per_table_type() {
        let params = QueryParams::new();

        let tables: Vec<_> = [
            TableType::DataValue,
            TableType::Completeness,
            TableType::CompletenessTarget,
            TableType::OrgUnitTarget,
            TableType::ValidationResult,
        ]
            .iter()
            .map(|t| from_clause(&StandardSql, &params, *t).unwrap())
            .collect();

        assert_eq!(tables, vec![
            " from \"analytics\" as ax",
            " from \"analytics_completeness\" as ax",
            " from \"analytics_completenesstarget\" as ax",
            " from \"analytics_orgunittarget\" as ax",
            " from \"analytics_validationresult\" as ax",
        ]);
    }

    #[test]
    fn test_table_name_override_wins() {
        let params = QueryParams::new()
            .with_table_name("analytics_temp")
            .with_partitions(vec![2021]);

        assert_eq!(
            source_clause(&StandardSql, &params, TableType::Completeness),
            "\"analytics_temp_2021\"",
        );
    }

    #[test]
    fn test_partition_of_table_type() {
        let params = QueryParams::new().with_partitions(vec![2020]);

        assert_eq!(
            source_clause(&StandardSql, &params, TableType::Completeness),
            "\"analytics_completeness_2020\"",
        );
    }
}
