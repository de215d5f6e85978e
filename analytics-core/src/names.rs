//! Identifiers and dimensional objects of an analytics query:
//! - uid
//! - dimension item
//! - organisation unit
//! - dimension
//
// Dimensions implement FromStr for the request syntax
// - dx:fbfJHSPpUQD;cYeuwXTCPkU
// - pe:202001;202002
// - ou
// so that a query can be written down on one line.

use anyhow::Error;
use chrono::{Datelike, Duration, NaiveDate};
use itertools::join;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::QueryError;

pub const UID_LENGTH: usize = 11;

pub const DATA_X_DIM_ID: &str = "dx";
pub const PERIOD_DIM_ID: &str = "pe";
pub const ORGUNIT_DIM_ID: &str = "ou";
pub const CATEGORYOPTIONCOMBO_DIM_ID: &str = "co";
pub const ATTRIBUTEOPTIONCOMBO_DIM_ID: &str = "ao";

/// Metadata identifier. Always 11 characters, a letter followed by
/// letters or digits, which keeps it safe to inline into sql.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uid(String);

impl Uid {
    pub fn new<S: Into<String>>(uid: S) -> Result<Self, QueryError> {
        let uid = uid.into();

        if Uid::is_valid(&uid) {
            Ok(Uid(uid))
        } else {
            Err(QueryError::InvalidUid { uid })
        }
    }

    pub fn is_valid(s: &str) -> bool {
        let mut chars = s.chars();

        s.len() == UID_LENGTH
            && chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
            && chars.all(|c| c.is_ascii_alphanumeric())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Uid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Uid::new(s.trim())?)
    }
}

impl std::convert::TryFrom<String> for Uid {
    type Error = QueryError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Uid::new(s)
    }
}

impl From<Uid> for String {
    fn from(uid: Uid) -> String {
        uid.0
    }
}


/// One selectable value of a dimension. `id` is a uid for metadata items
/// and an ISO identifier (`2020`, `202001`, `2020Q1`) for periods.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DimensionItem {
    pub id: String,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl DimensionItem {
    pub fn new<S: Into<String>>(id: S) -> Self {
        DimensionItem {
            id: id.into(),
            level: None,
            path: None,
            start_date: None,
            end_date: None,
        }
    }

    /// Period item; start and end dates are derived from the ISO
    /// identifier when it is one of the supported period types.
    pub fn period<S: Into<String>>(iso: S) -> Self {
        let mut item = DimensionItem::new(iso);

        if let Some((start, end)) = iso_period_range(&item.id) {
            item.start_date = Some(start);
            item.end_date = Some(end);
        }

        item
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Inclusive number of days, when the item carries a date range.
    pub fn days_in_period(&self) -> Option<u32> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start <= end => {
                Some((end - start).num_days() as u32 + 1)
            },
            _ => None,
        }
    }
}

impl fmt::Display for DimensionItem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}


/// Organisation unit as used for approval levels. The level drives the
/// `uidlevel{n}` column the uid is matched against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgUnit {
    pub uid: Uid,
    pub level: u32,
    #[serde(default)]
    pub path: Option<String>,
}

impl OrgUnit {
    pub fn new(uid: Uid, level: u32) -> Self {
        OrgUnit {
            uid,
            level,
            path: None,
        }
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DimensionType {
    DataX,
    Period,
    OrganisationUnit,
    CategoryOptionCombo,
    AttributeOptionCombo,
    OrganisationUnitGroupSet,
    DataElementGroupSet,
    CategoryOptionGroupSet,
    Category,
}

impl DimensionType {
    /// Type of the well-known dimensions; everything else is treated as a
    /// category (dynamic dimension).
    pub fn from_dimension_id(dimension: &str) -> Self {
        match dimension {
            DATA_X_DIM_ID => DimensionType::DataX,
            PERIOD_DIM_ID => DimensionType::Period,
            ORGUNIT_DIM_ID => DimensionType::OrganisationUnit,
            CATEGORYOPTIONCOMBO_DIM_ID => DimensionType::CategoryOptionCombo,
            ATTRIBUTEOPTIONCOMBO_DIM_ID => DimensionType::AttributeOptionCombo,
            _ => DimensionType::Category,
        }
    }
}


/// Dimensional object: a dimension of the query together with the items
/// selected for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub dimension: String,
    /// Analytics table column; the dimension identifier when absent.
    #[serde(default)]
    pub dimension_name: Option<String>,
    pub dimension_type: DimensionType,
    /// Fixed dimensions are not backed by a column.
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub items: Vec<DimensionItem>,
}

impl Dimension {
    pub fn new<S: Into<String>>(
        dimension: S,
        dimension_type: DimensionType,
        items: Vec<DimensionItem>,
        ) -> Self
    {
        Dimension {
            dimension: dimension.into(),
            dimension_name: None,
            dimension_type,
            fixed: false,
            items,
        }
    }

    pub fn with_dimension_name<S: Into<String>>(mut self, dimension_name: S) -> Self {
        self.dimension_name = Some(dimension_name.into());
        self
    }

    pub fn fixed(mut self) -> Self {
        self.fixed = true;
        self
    }

    pub fn has_items(&self) -> bool {
        !self.items.is_empty()
    }

    pub fn column_name(&self) -> &str {
        self.dimension_name
            .as_ref()
            .map(|s| s.as_str())
            .unwrap_or(self.dimension.as_str())
    }

    pub fn item_ids(&self) -> Vec<&str> {
        self.items.iter().map(|i| i.id.as_str()).collect()
    }

    /// Period items without dates get the range of their ISO identifier.
    pub fn with_period_dates(mut self) -> Self {
        if self.dimension_type != DimensionType::Period {
            return self;
        }

        for item in self.items.iter_mut() {
            if item.start_date.is_some() || item.end_date.is_some() {
                continue;
            }

            if let Some((start, end)) = iso_period_range(&item.id) {
                item.start_date = Some(start);
                item.end_date = Some(end);
            }
        }

        self
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.items.is_empty() {
            write!(f, "{}", self.dimension)
        } else {
            write!(f, "{}:{}", self.dimension, join(&self.items, ";"))
        }
    }
}

impl FromStr for Dimension {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ':');

        let dimension = parts.next()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| QueryError::InvalidDimension { param: s.to_owned() })?;

        if !is_valid_identifier(dimension) {
            return Err(QueryError::InvalidDimension { param: s.to_owned() }.into());
        }

        let dimension_type = DimensionType::from_dimension_id(dimension);

        let items = parts.next()
            .map(|items| {
                items.split(';')
                    .map(|i| i.trim())
                    .filter(|i| !i.is_empty())
                    .map(|i| match dimension_type {
                        DimensionType::Period => DimensionItem::period(i),
                        _ => DimensionItem::new(i),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Dimension::new(dimension, dimension_type, items))
    }
}


/// Column and table names accepted from outside: letters, digits and `_`.
pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}


/// Start and end date of a yearly (`2020`), quarterly (`2020Q1`),
/// monthly (`202001`) or daily (`20200101`) ISO period.
pub fn iso_period_range(iso: &str) -> Option<(NaiveDate, NaiveDate)> {
    if !iso.is_ascii() {
        return None;
    }

    match iso.len() {
        4 => {
            let year = iso.parse::<i32>().ok()?;
            Some((NaiveDate::from_ymd_opt(year, 1, 1)?, NaiveDate::from_ymd_opt(year, 12, 31)?))
        },
        6 if iso.as_bytes()[4] == b'Q' => {
            let year = iso[..4].parse::<i32>().ok()?;
            let quarter = iso[5..].parse::<u32>().ok().filter(|q| (1..=4).contains(q))?;
            let start = NaiveDate::from_ymd_opt(year, (quarter - 1) * 3 + 1, 1)?;
            Some((start, last_day_of_month(year, quarter * 3)?))
        },
        6 => {
            let year = iso[..4].parse::<i32>().ok()?;
            let month = iso[4..].parse::<u32>().ok()?;
            Some((NaiveDate::from_ymd_opt(year, month, 1)?, last_day_of_month(year, month)?))
        },
        8 => {
            let day = NaiveDate::parse_from_str(iso, "%Y%m%d").ok()?;
            Some((day, day))
        },
        _ => None,
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = first_of_next - Duration::days(1);

    debug_assert_eq!(last.month(), month);
    Some(last)
}
