mod dialect;
mod error;
pub mod names;
mod query;
pub mod sql;

pub use self::dialect::{Dialect, StandardSql, ANALYTICS_TBL_ALIAS};
pub use self::error::QueryError;
pub use self::names::{
    Dimension,
    DimensionItem,
    DimensionType,
    OrgUnit,
    Uid,
};
pub use self::query::{
    AggregationType,
    AnalyticsAggregationType,
    DataType,
    MeasureFilter,
    Partitions,
    QueryParams,
    TableType,
    DEFAULT_TABLE_NAME,
    DEFAULT_VALUE_COLUMN,
    LAST_VALUE_YEARS_OFFSET,
};
