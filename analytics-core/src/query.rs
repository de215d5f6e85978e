use anyhow::Error;
use chrono::{Months, NaiveDate};
use indexmap::IndexMap;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;
use crate::names::{
    Dimension,
    DimensionItem,
    DimensionType,
    OrgUnit,
};

pub const DEFAULT_TABLE_NAME: &str = "analytics";
pub const DEFAULT_VALUE_COLUMN: &str = "value";

/// Parameters of one aggregate analytics query. Built upstream and only read
/// while sql is generated.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub dimensions: Vec<Dimension>,
    pub filters: Vec<Dimension>,
    pub aggregation_type: AnalyticsAggregationType,
    pub measure_criteria: IndexMap<MeasureFilter, f64>,
    pub pre_aggregate_measure_criteria: IndexMap<MeasureFilter, f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_date_restriction: Option<NaiveDate>,
    pub end_date_restriction: Option<NaiveDate>,
    pub restrict_by_org_unit_opening_closed_date: bool,
    pub restrict_by_category_option_start_end_date: bool,
    pub data_approval: bool,
    pub data_approval_levels: IndexMap<OrgUnit, u32>,
    pub partitions: Partitions,
    pub skip_partitioning: bool,
    pub timely: bool,
    /// Overrides the table of the table type.
    pub table_name: Option<String>,
    pub value_column: String,
}

impl QueryParams {
    pub fn new() -> Self {
        QueryParams {
            dimensions: vec![],
            filters: vec![],
            aggregation_type: AnalyticsAggregationType::default(),
            measure_criteria: IndexMap::new(),
            pre_aggregate_measure_criteria: IndexMap::new(),
            start_date: None,
            end_date: None,
            start_date_restriction: None,
            end_date_restriction: None,
            restrict_by_org_unit_opening_closed_date: false,
            restrict_by_category_option_start_end_date: false,
            data_approval: false,
            data_approval_levels: IndexMap::new(),
            partitions: Partitions::default(),
            skip_partitioning: false,
            timely: false,
            table_name: None,
            value_column: DEFAULT_VALUE_COLUMN.to_owned(),
        }
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.dimensions.push(dimension.with_period_dates());
        self
    }

    pub fn with_filter(mut self, filter: Dimension) -> Self {
        self.filters.push(filter.with_period_dates());
        self
    }

    pub fn with_aggregation_type(mut self, aggregation_type: AnalyticsAggregationType) -> Self {
        self.aggregation_type = aggregation_type;
        self
    }

    pub fn with_measure_criteria(mut self, filter: MeasureFilter, criterion: f64) -> Self {
        self.measure_criteria.insert(filter, criterion);
        self
    }

    pub fn with_pre_aggregate_measure_criteria(mut self, filter: MeasureFilter, criterion: f64) -> Self {
        self.pre_aggregate_measure_criteria.insert(filter, criterion);
        self
    }

    pub fn with_start_end_date(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_start_end_date_restriction(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date_restriction = Some(start);
        self.end_date_restriction = Some(end);
        self
    }

    pub fn with_restrict_by_org_unit_opening_closed_date(mut self, restrict: bool) -> Self {
        self.restrict_by_org_unit_opening_closed_date = restrict;
        self
    }

    pub fn with_restrict_by_category_option_start_end_date(mut self, restrict: bool) -> Self {
        self.restrict_by_category_option_start_end_date = restrict;
        self
    }

    /// Also requests approval filtering; use `with_data_approval(false)`
    /// afterwards to keep the levels without filtering on them.
    pub fn with_data_approval_level(mut self, org_unit: OrgUnit, level: u32) -> Self {
        self.data_approval_levels.insert(org_unit, level);
        self.data_approval = true;
        self
    }

    pub fn with_data_approval(mut self, data_approval: bool) -> Self {
        self.data_approval = data_approval;
        self
    }

    pub fn with_partitions<I: IntoIterator<Item = i32>>(mut self, years: I) -> Self {
        self.partitions = Partitions::new(years);
        self
    }

    pub fn with_skip_partitioning(mut self, skip_partitioning: bool) -> Self {
        self.skip_partitioning = skip_partitioning;
        self
    }

    pub fn with_timely(mut self, timely: bool) -> Self {
        self.timely = timely;
        self
    }

    pub fn with_table_name<S: Into<String>>(mut self, table_name: S) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn with_value_column<S: Into<String>>(mut self, value_column: S) -> Self {
        self.value_column = value_column.into();
        self
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams::new()
    }
}

impl QueryParams {
    /// Filters grouped by dimension identifier, in the order the filters were
    /// added. Items of filters sharing a key are or'ed together.
    pub fn dimension_filter_map(&self) -> IndexMap<String, Vec<Dimension>> {
        let mut map: IndexMap<String, Vec<Dimension>> = IndexMap::new();

        for filter in &self.filters {
            map.entry(filter.dimension.clone())
                .or_insert_with(Vec::new)
                .push(filter.clone());
        }

        map
    }

    pub fn dimensions_and_filters(&self) -> impl Iterator<Item = &Dimension> {
        self.dimensions.iter().chain(self.filters.iter())
    }

    pub fn has_dimension(&self, dimension: &str) -> bool {
        self.dimensions.iter().any(|d| d.dimension == dimension)
    }

    pub fn has_filter(&self, filter: &str) -> bool {
        self.filters.iter().any(|d| d.dimension == filter)
    }

    /// Period items, dimensions before filters.
    pub fn periods(&self) -> Vec<&DimensionItem> {
        self.dimensions_and_filters()
            .filter(|d| d.dimension_type == DimensionType::Period)
            .flat_map(|d| d.items.iter())
            .collect()
    }

    fn dimension_periods(&self) -> Vec<&DimensionItem> {
        self.dimensions.iter()
            .filter(|d| d.dimension_type == DimensionType::Period)
            .flat_map(|d| d.items.iter())
            .collect()
    }

    fn filter_periods(&self) -> Vec<&DimensionItem> {
        self.filters.iter()
            .filter(|d| d.dimension_type == DimensionType::Period)
            .flat_map(|d| d.items.iter())
            .collect()
    }

    pub fn has_start_date(&self) -> bool {
        self.start_date.is_some()
    }

    pub fn has_end_date(&self) -> bool {
        self.end_date.is_some()
    }

    pub fn has_start_end_date_restriction(&self) -> bool {
        self.start_date_restriction.is_some() && self.end_date_restriction.is_some()
    }

    pub fn start_date_after_end_date(&self) -> bool {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => start > end,
            _ => false,
        }
    }

    pub fn is_data_approval(&self) -> bool {
        self.data_approval && !self.data_approval_levels.is_empty()
    }

    pub fn has_partitions(&self) -> bool {
        self.partitions.has_any()
    }

    pub fn has_measure_criteria(&self) -> bool {
        !self.measure_criteria.is_empty()
    }

    pub fn has_pre_aggregate_measure_criteria(&self) -> bool {
        !self.pre_aggregate_measure_criteria.is_empty()
    }

    /// Aggregation means grouping by the dimension columns.
    pub fn is_aggregation(&self) -> bool {
        self.aggregation_type.aggregation_type != AggregationType::None
    }

    /// Base table the statement reads, before partitioning.
    pub fn table_name(&self, table_type: TableType) -> &str {
        self.table_name.as_deref().unwrap_or_else(|| table_type.table_name())
    }

    /// Measure criteria are inlined as numbers; NaN and infinities have no
    /// sql form.
    pub fn has_finite_measure_criteria(&self) -> bool {
        self.measure_criteria.values()
            .chain(self.pre_aggregate_measure_criteria.values())
            .all(|c| c.is_finite())
    }

    pub fn is_data_type(&self, data_type: DataType) -> bool {
        self.aggregation_type.data_type == Some(data_type)
    }

    /// Period with the latest end date.
    pub fn latest_period(&self) -> Option<&DimensionItem> {
        self.periods()
            .into_iter()
            .filter(|p| p.end_date.is_some())
            .max_by_key(|p| p.end_date)
    }

    /// Latest end date of any period, or the end date of the query.
    pub fn latest_end_date(&self) -> Option<NaiveDate> {
        self.periods()
            .into_iter()
            .filter_map(|p| p.end_date)
            .chain(self.end_date)
            .max()
    }

    /// Earliest start date of any period, or the start date of the query.
    pub fn earliest_start_date(&self) -> Option<NaiveDate> {
        self.periods()
            .into_iter()
            .filter_map(|p| p.start_date)
            .chain(self.start_date)
            .min()
    }

    /// Number of days to divide by for sum aggregation with average period
    /// aggregation. A period dimension contributes the days of its first
    /// period, a period filter the total of its periods, and otherwise the
    /// start and end date of the query are used.
    pub fn days_for_avg_sum_int_aggregation(&self) -> Result<u32, Error> {
        let dimension_periods = self.dimension_periods();

        if !dimension_periods.is_empty() {
            return dimension_periods[0].days_in_period()
                .ok_or_else(|| QueryError::illegal(format!("period {} has no date range", dimension_periods[0].id)).into());
        }

        let filter_periods = self.filter_periods();

        if !filter_periods.is_empty() {
            let mut total = 0;

            for period in filter_periods {
                total += period.days_in_period()
                    .ok_or_else(|| QueryError::illegal(format!("period {} has no date range", period.id)))?;
            }

            return Ok(total);
        }

        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start <= end => Ok((end - start).num_days() as u32 + 1),
            _ => Err(QueryError::illegal("average sum aggregation requires periods or a start and end date").into()),
        }
    }

    /// Earliest date considered by the first and last value sub query, ten
    /// years back from the latest end date.
    pub fn first_or_last_value_earliest_date(&self, latest: NaiveDate) -> NaiveDate {
        latest.checked_sub_months(Months::new(12 * LAST_VALUE_YEARS_OFFSET))
            .unwrap_or(latest)
    }
}

pub const LAST_VALUE_YEARS_OFFSET: u32 = 10;


/// Year partitions of the analytics table, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partitions(BTreeSet<i32>);

impl Partitions {
    pub fn new<I: IntoIterator<Item = i32>>(years: I) -> Self {
        Partitions(years.into_iter().collect())
    }

    pub fn has_any(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn has_one(&self) -> bool {
        self.0.len() == 1
    }

    pub fn has_multiple(&self) -> bool {
        self.0.len() > 1
    }

    pub fn any(&self) -> Option<i32> {
        self.0.iter().next().cloned()
    }

    pub fn years(&self) -> impl Iterator<Item = &i32> {
        self.0.iter()
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregationType {
    Sum,
    Average,
    Count,
    Stddev,
    Variance,
    Min,
    Max,
    None,
    First,
    Last,
    LastInPeriod,
}

impl FromStr for AggregationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase().replace('-', "_")[..] {
            "sum" => Ok(AggregationType::Sum),
            "average" | "avg" => Ok(AggregationType::Average),
            "count" => Ok(AggregationType::Count),
            "stddev" => Ok(AggregationType::Stddev),
            "variance" => Ok(AggregationType::Variance),
            "min" => Ok(AggregationType::Min),
            "max" => Ok(AggregationType::Max),
            "none" => Ok(AggregationType::None),
            "first" => Ok(AggregationType::First),
            "last" => Ok(AggregationType::Last),
            "last_in_period" => Ok(AggregationType::LastInPeriod),
            _ => Err(QueryError::unknown("aggregation type", s).into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Numeric,
    Boolean,
    Text,
}

/// Aggregation across the non-period dimensions together with the
/// aggregation across periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalyticsAggregationType {
    pub aggregation_type: AggregationType,
    pub period_aggregation_type: AggregationType,
    #[serde(default)]
    pub data_type: Option<DataType>,
}

impl AnalyticsAggregationType {
    pub fn new(aggregation_type: AggregationType, period_aggregation_type: AggregationType) -> Self {
        AnalyticsAggregationType {
            aggregation_type,
            period_aggregation_type,
            data_type: None,
        }
    }

    /// Same aggregation across all dimensions, periods included.
    pub fn uniform(aggregation_type: AggregationType) -> Self {
        AnalyticsAggregationType::new(aggregation_type, aggregation_type)
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn is_aggregation_type(&self, aggregation_type: AggregationType) -> bool {
        self.aggregation_type == aggregation_type
    }

    pub fn is_period_aggregation_type(&self, aggregation_type: AggregationType) -> bool {
        self.period_aggregation_type == aggregation_type
    }

    pub fn is_numeric_data_type(&self) -> bool {
        self.data_type == Some(DataType::Numeric)
    }

    pub fn is_boolean_data_type(&self) -> bool {
        self.data_type == Some(DataType::Boolean)
    }

    pub fn is_first_period_aggregation_type(&self) -> bool {
        self.period_aggregation_type == AggregationType::First
    }

    pub fn is_first_or_last_period_aggregation_type(&self) -> bool {
        match self.period_aggregation_type {
            AggregationType::First | AggregationType::Last => true,
            _ => false,
        }
    }

    pub fn is_last_in_period_aggregation_type(&self) -> bool {
        self.period_aggregation_type == AggregationType::LastInPeriod
    }

    pub fn is_first_or_last_or_last_in_period_aggregation_type(&self) -> bool {
        self.is_first_or_last_period_aggregation_type() || self.is_last_in_period_aggregation_type()
    }
}

impl Default for AnalyticsAggregationType {
    fn default() -> Self {
        AnalyticsAggregationType::uniform(AggregationType::Sum)
            .with_data_type(DataType::Numeric)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasureFilter {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl MeasureFilter {
    pub fn sql_string(&self) -> &'static str {
        match self {
            MeasureFilter::Eq => "=",
            MeasureFilter::Gt => ">",
            MeasureFilter::Ge => ">=",
            MeasureFilter::Lt => "<",
            MeasureFilter::Le => "<=",
        }
    }
}

impl FromStr for MeasureFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase()[..] {
            "eq" => Ok(MeasureFilter::Eq),
            "gt" => Ok(MeasureFilter::Gt),
            "ge" | "gte" => Ok(MeasureFilter::Ge),
            "lt" => Ok(MeasureFilter::Lt),
            "le" | "lte" => Ok(MeasureFilter::Le),
            _ => Err(QueryError::unknown("measure filter", s).into()),
        }
    }
}


/// Analytics table a query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    DataValue,
    Completeness,
    CompletenessTarget,
    OrgUnitTarget,
    ValidationResult,
}

impl TableType {
    pub fn table_name(&self) -> &'static str {
        match self {
            TableType::DataValue => DEFAULT_TABLE_NAME,
            TableType::Completeness => "analytics_completeness",
            TableType::CompletenessTarget => "analytics_completenesstarget",
            TableType::OrgUnitTarget => "analytics_orgunittarget",
            TableType::ValidationResult => "analytics_validationresult",
        }
    }

    /// Target tables hold no period columns.
    pub fn has_period_dimension(&self) -> bool {
        match self {
            TableType::CompletenessTarget | TableType::OrgUnitTarget => false,
            _ => true,
        }
    }
}

impl fmt::Display for TableType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.table_name())
    }
}

impl FromStr for TableType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match &s.to_lowercase().replace('_', "-")[..] {
            "data-value" | "analytics" => Ok(TableType::DataValue),
            "completeness" => Ok(TableType::Completeness),
            "completeness-target" => Ok(TableType::CompletenessTarget),
            "org-unit-target" => Ok(TableType::OrgUnitTarget),
            "validation-result" => Ok(TableType::ValidationResult),
            _ => Err(QueryError::unknown("table type", s).into()),
        }
    }
}
