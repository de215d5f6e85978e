use analytics_core::sql::{
    append_approval,
    append_filters,
    append_restrictions,
    where_clause,
    Conjunction,
};
use analytics_core::{
    Dimension,
    DimensionItem,
    DimensionType,
    OrgUnit,
    QueryParams,
    StandardSql,
    TableType,
    Uid,
};
use chrono::NaiveDate;
use std::collections::HashMap;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ou(uid: &str, level: u32) -> OrgUnit {
    OrgUnit::new(Uid::new(uid).unwrap(), level)
}

fn column_filter(dimension: &str, column: &str, items: &[&str]) -> Dimension {
    Dimension::new(
        dimension,
        DimensionType::Category,
        items.iter().map(|i| DimensionItem::new(*i)).collect(),
    )
    .with_dimension_name(column)
}

/// Runs filters, restrictions and approval on a fresh buffer.
fn appenders_sql(params: &QueryParams) -> String {
    let mut sql = String::new();
    let mut conj = Conjunction::where_clause();

    append_filters(&StandardSql, params, &mut sql, &mut conj);
    append_restrictions(&StandardSql, params, TableType::DataValue, &mut sql, &mut conj);
    append_approval(&StandardSql, params, &mut sql, &mut conj);

    sql
}

#[test]
fn empty_filters_emit_nothing() {
    let mut sql = String::new();
    let mut conj = Conjunction::where_clause();
    append_filters(&StandardSql, &QueryParams::new(), &mut sql, &mut conj);

    assert_eq!(sql, "");
    assert!(!conj.is_started());

    let params = QueryParams::new()
        .with_filter(column_filter("colA", "colA", &[]))
        .with_filter(column_filter("colB", "colB", &[]));
    append_filters(&StandardSql, &params, &mut sql, &mut conj);

    assert_eq!(sql, "");
    assert!(!conj.is_started());
}

#[test]
fn filters_and_across_dimensions() {
    let params = QueryParams::new()
        .with_filter(column_filter("colA", "colA", &["a1", "a2"]))
        .with_filter(column_filter("colB", "colB", &["b1"]));

    let mut sql = String::new();
    let mut conj = Conjunction::where_clause();
    append_filters(&StandardSql, &params, &mut sql, &mut conj);

    assert_eq!(
        sql,
        " where ( ax.\"colA\" in ('a1','a2') ) and ( ax.\"colB\" in ('b1') )",
    );
}

#[test]
fn timely_alone() {
    let params = QueryParams::new().with_timely(true);

    assert_eq!(appenders_sql(&params), " where ax.\"timely\" = true");
}

#[test]
fn opening_closed_date_tolerates_null() {
    let params = QueryParams::new()
        .with_restrict_by_org_unit_opening_closed_date(true)
        .with_start_end_date_restriction(date(2020, 1, 1), date(2020, 12, 31));

    let sql = appenders_sql(&params);

    assert_eq!(
        sql,
        " where ((ax.\"ouopeningdate\" <= '2020-12-31' or ax.\"ouopeningdate\" is null) \
        and (ax.\"oucloseddate\" >= '2020-01-01' or ax.\"oucloseddate\" is null))",
    );

    let row = |opening: Option<NaiveDate>, closed: Option<NaiveDate>| {
        let mut row = HashMap::new();
        row.insert("ouopeningdate", opening);
        row.insert("oucloseddate", closed);
        row
    };

    assert!(row_matches(&sql, &row(Some(date(2020, 6, 1)), None)));
    assert!(row_matches(&sql, &row(None, None)));
    assert!(row_matches(&sql, &row(Some(date(2019, 1, 1)), Some(date(2020, 3, 1)))));
    assert!(!row_matches(&sql, &row(Some(date(2021, 2, 1)), None)));
    assert!(!row_matches(&sql, &row(Some(date(2019, 1, 1)), Some(date(2019, 6, 30)))));
}

/// Evaluates a where clause made of `and`-joined groups of `or`-joined date
/// comparisons against one row. Comparing a null yields false.
fn row_matches(sql: &str, row: &HashMap<&str, Option<NaiveDate>>) -> bool {
    let body = sql
        .trim_start_matches(" where ")
        .trim_start_matches('(')
        .trim_end_matches(')');

    body.split(") and (").all(|group| {
        group.split(" or ").any(|predicate| {
            let predicate = predicate.trim_start_matches("ax.\"");
            let (column, rest) = predicate.split_at(predicate.find('"').unwrap());
            let value = row[column];
            let rest = rest[1..].trim();

            if rest == "is null" {
                return value.is_none();
            }

            let (op, literal) = rest.split_at(rest.find(' ').unwrap());
            let literal = NaiveDate::parse_from_str(literal.trim().trim_matches('\''), "%Y-%m-%d").unwrap();

            match (value, op) {
                (Some(v), "<=") => v <= literal,
                (Some(v), ">=") => v >= literal,
                (Some(v), "<") => v < literal,
                (Some(v), ">") => v > literal,
                (Some(v), "=") => v == literal,
                _ => false,
            }
        })
    })
}

#[test]
fn approval_not_requested() {
    let params = QueryParams::new()
        .with_data_approval_level(ou("ImspTQPwCqd", 1), 2)
        .with_data_approval(false);

    let mut sql = " where ax.\"dx\" in ('fbfJHSPpUQD')".to_owned();
    let mut conj = Conjunction::where_clause();
    conj.next();
    append_approval(&StandardSql, &params, &mut sql, &mut conj);

    assert_eq!(sql, " where ax.\"dx\" in ('fbfJHSPpUQD')");
}

#[test]
fn approval_disjunction() {
    let params = QueryParams::new()
        .with_data_approval_level(ou("ImspTQPwCqd", 1), 3)
        .with_data_approval_level(ou("O6uvpzGd5pu", 2), 2);

    assert_eq!(
        appenders_sql(&params),
        " where ( (ax.\"uidlevel1\" = 'ImspTQPwCqd' and ax.\"approvallevel\" <= 3) \
        or (ax.\"uidlevel2\" = 'O6uvpzGd5pu' and ax.\"approvallevel\" <= 2) )",
    );
}

#[test]
fn single_where_token() {
    let params = QueryParams::new()
        .with_filter(column_filter("colA", "colA", &["a1"]))
        .with_timely(true)
        .with_partitions(vec![2019, 2020])
        .with_data_approval_level(ou("ImspTQPwCqd", 1), 3);

    let sql = appenders_sql(&params);

    assert_eq!(sql.matches(" where ").count(), 1);
    assert!(sql.starts_with(" where "));
    // timely, year and approval, plus the and inside the approval pair
    assert_eq!(sql.matches(" and ").count(), 4);

    // restrictions alone, then approval alone
    let sql = appenders_sql(&QueryParams::new().with_timely(true).with_data_approval_level(ou("ImspTQPwCqd", 1), 3));
    assert_eq!(sql.matches(" where ").count(), 1);

    let sql = appenders_sql(&QueryParams::new().with_data_approval_level(ou("ImspTQPwCqd", 1), 3));
    assert_eq!(sql.matches(" where ").count(), 1);
    assert_eq!(sql.matches(" and ").count(), 1);
}

#[test]
fn deterministic_output() {
    let params = QueryParams::new()
        .with_dimension("dx:fbfJHSPpUQD;cYeuwXTCPkU".parse().unwrap())
        .with_filter("ou:ImspTQPwCqd;O6uvpzGd5pu".parse().unwrap())
        .with_filter("pe:2020".parse().unwrap())
        .with_partitions(vec![2020, 2019, 2021])
        .with_restrict_by_category_option_start_end_date(true)
        .with_start_end_date_restriction(date(2020, 1, 1), date(2020, 12, 31))
        .with_data_approval_level(ou("ImspTQPwCqd", 1), 3)
        .with_data_approval_level(ou("O6uvpzGd5pu", 2), 2);

    let first = where_clause(&StandardSql, &params, TableType::DataValue);

    for _ in 0..10 {
        assert_eq!(where_clause(&StandardSql, &params.clone(), TableType::DataValue), first);
    }
}
