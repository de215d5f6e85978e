//! Restrictions that do not come from the dimensions of the query. Every
//! step decides on its own whether it applies; the order of
//! `RESTRICTION_STEPS` is the order of the predicates in the sql.

use itertools::join;

use super::{medium_date, Conjunction};
use crate::dialect::Dialect;
use crate::query::{QueryParams, TableType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestrictionStep {
    OrgUnitOpeningClosedDate,
    CategoryOptionStartEndDate,
    PeriodStartDate,
    PeriodEndDate,
    Timely,
    Partitions,
    PeriodRank,
}

pub const RESTRICTION_STEPS: [RestrictionStep; 7] = [
    RestrictionStep::OrgUnitOpeningClosedDate,
    RestrictionStep::CategoryOptionStartEndDate,
    RestrictionStep::PeriodStartDate,
    RestrictionStep::PeriodEndDate,
    RestrictionStep::Timely,
    RestrictionStep::Partitions,
    RestrictionStep::PeriodRank,
];

impl RestrictionStep {
    pub fn applies(&self, params: &QueryParams, table_type: TableType) -> bool {
        match self {
            RestrictionStep::OrgUnitOpeningClosedDate => {
                params.restrict_by_org_unit_opening_closed_date && params.has_start_end_date_restriction()
            },
            RestrictionStep::CategoryOptionStartEndDate => {
                params.restrict_by_category_option_start_end_date && params.has_start_end_date_restriction()
            },
            RestrictionStep::PeriodStartDate => {
                table_type.has_period_dimension() && params.has_start_date()
            },
            RestrictionStep::PeriodEndDate => {
                table_type.has_period_dimension() && params.has_end_date()
            },
            RestrictionStep::Timely => params.timely,
            RestrictionStep::Partitions => {
                !params.skip_partitioning && params.has_partitions()
            },
            RestrictionStep::PeriodRank => {
                params.aggregation_type.is_first_or_last_or_last_in_period_aggregation_type()
            },
        }
    }

    /// None when a value the step needs is missing; `applies` rules that
    /// out for every step.
    pub fn predicate<D: Dialect + ?Sized>(&self, dialect: &D, params: &QueryParams) -> Option<String> {
        match self {
            RestrictionStep::OrgUnitOpeningClosedDate => {
                date_range_overlap(dialect, params, "ouopeningdate", "oucloseddate")
            },
            RestrictionStep::CategoryOptionStartEndDate => {
                date_range_overlap(dialect, params, "costartdate", "coenddate")
            },
            RestrictionStep::PeriodStartDate => {
                let start = params.start_date?;
                Some(format!("{} >= '{}'", dialect.quote_alias("pestartdate"), medium_date(&start)))
            },
            RestrictionStep::PeriodEndDate => {
                let end = params.end_date?;
                Some(format!("{} <= '{}'", dialect.quote_alias("peenddate"), medium_date(&end)))
            },
            RestrictionStep::Timely => {
                Some(format!("{} = true", dialect.quote_alias("timely")))
            },
            RestrictionStep::Partitions => {
                Some(format!("{} in ({})",
                    dialect.quote_alias("year"),
                    join(params.partitions.years(), ", "),
                ))
            },
            RestrictionStep::PeriodRank => {
                Some(format!("{} = 1", dialect.quote_alias("pe_rank")))
            },
        }
    }
}

/// Row is kept when its validity interval overlaps the restriction. A null
/// bound means open ended and never excludes the row.
fn date_range_overlap<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    start_column: &str,
    end_column: &str,
    ) -> Option<String>
{
    let start = params.start_date_restriction?;
    let end = params.end_date_restriction?;

    let start_column = dialect.quote_alias(start_column);
    let end_column = dialect.quote_alias(end_column);

    Some(format!("(({s} <= '{end}' or {s} is null) and ({e} >= '{start}' or {e} is null))",
        s = start_column,
        e = end_column,
        start = medium_date(&start),
        end = medium_date(&end),
    ))
}

pub fn append_restrictions<D: Dialect + ?Sized>(
    dialect: &D,
    params: &QueryParams,
    table_type: TableType,
    sql: &mut String,
    conj: &mut Conjunction,
    )
{
    for step in RESTRICTION_STEPS.iter() {
        if !step.applies(params, table_type) {
            continue;
        }

        if let Some(predicate) = step.predicate(dialect, params) {
            sql.push_str(conj.next());
            sql.push_str(&predicate);
        }
    }
}
