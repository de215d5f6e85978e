use anyhow::{Error, format_err};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde_derive::Deserialize;
use std::convert::TryFrom;

use analytics_core::{
    AnalyticsAggregationType,
    Dimension,
    MeasureFilter,
    OrgUnit,
    QueryParams,
    Uid,
};


/// Reads a query description from a JSON file and converts it into
/// `analytics_core::QueryParams`.
pub fn read_query(query_path: &str) -> Result<QueryParams, Error> {
    let query_str = std::fs::read_to_string(query_path)
        .map_err(|_| format_err!("Query file not found at {}", query_path))?;

    QueryParams::try_from(serde_json::from_str::<QueryConfig>(&query_str)?)
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default)]
    pub dimensions: Vec<DimensionConfig>,
    #[serde(default)]
    pub filters: Vec<DimensionConfig>,
    pub aggregation_type: Option<AnalyticsAggregationType>,
    #[serde(default)]
    pub measure_criteria: IndexMap<MeasureFilter, f64>,
    #[serde(default)]
    pub pre_aggregate_measure_criteria: IndexMap<MeasureFilter, f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_date_restriction: Option<NaiveDate>,
    pub end_date_restriction: Option<NaiveDate>,
    #[serde(default)]
    pub restrict_by_org_unit_opening_closed_date: bool,
    #[serde(default)]
    pub restrict_by_category_option_start_end_date: bool,
    /// Defaults to filtering on approval whenever levels are given.
    pub data_approval: Option<bool>,
    #[serde(default)]
    pub data_approval_levels: Vec<ApprovalLevelConfig>,
    #[serde(default)]
    pub partitions: Vec<i32>,
    #[serde(default)]
    pub skip_partitioning: bool,
    #[serde(default)]
    pub timely: bool,
    pub table: Option<String>,
    pub value_column: Option<String>,
}

/// Either the one-line syntax `dx:fbfJHSPpUQD;cYeuwXTCPkU` or a full
/// dimension object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DimensionConfig {
    Param(String),
    Object(Dimension),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalLevelConfig {
    pub uid: Uid,
    pub level: u32,
    pub approval_level: u32,
}

impl TryFrom<DimensionConfig> for Dimension {
    type Error = Error;

    fn try_from(dimension_config: DimensionConfig) -> Result<Self, Self::Error> {
        match dimension_config {
            DimensionConfig::Param(param) => param.parse(),
            DimensionConfig::Object(dimension) => Ok(dimension.with_period_dates()),
        }
    }
}

impl TryFrom<QueryConfig> for QueryParams {
    type Error = Error;

    fn try_from(query_config: QueryConfig) -> Result<Self, Self::Error> {
        let mut params = QueryParams::new();

        for dimension in query_config.dimensions {
            params = params.with_dimension(Dimension::try_from(dimension)?);
        }
        for filter in query_config.filters {
            params = params.with_filter(Dimension::try_from(filter)?);
        }

        if let Some(aggregation_type) = query_config.aggregation_type {
            params = params.with_aggregation_type(aggregation_type);
        }

        params.measure_criteria = query_config.measure_criteria;
        params.pre_aggregate_measure_criteria = query_config.pre_aggregate_measure_criteria;

        params.start_date = query_config.start_date;
        params.end_date = query_config.end_date;
        params.start_date_restriction = query_config.start_date_restriction;
        params.end_date_restriction = query_config.end_date_restriction;

        params = params
            .with_restrict_by_org_unit_opening_closed_date(query_config.restrict_by_org_unit_opening_closed_date)
            .with_restrict_by_category_option_start_end_date(query_config.restrict_by_category_option_start_end_date);

        for level in query_config.data_approval_levels {
            params = params.with_data_approval_level(
                OrgUnit::new(level.uid, level.level),
                level.approval_level,
            );
        }
        if let Some(data_approval) = query_config.data_approval {
            params = params.with_data_approval(data_approval);
        }

        params = params
            .with_partitions(query_config.partitions)
            .with_skip_partitioning(query_config.skip_partitioning)
            .with_timely(query_config.timely);

        if let Some(table) = query_config.table {
            params = params.with_table_name(table);
        }
        if let Some(value_column) = query_config.value_column {
            params = params.with_value_column(value_column);
        }

        Ok(params)
    }
}
