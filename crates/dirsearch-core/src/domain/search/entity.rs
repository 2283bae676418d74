//! Search entity and related types

use crate::domain::directory::Principal;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            _ => Err(Error::InvalidInput(format!(
                "Unknown order direction '{}', expected ASC or DESC",
                s
            ))),
        }
    }
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Offset/limit window; `None` means unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
}

impl Page {
    /// Marker accepted at the boundary for "no offset" / "no limit"
    pub const UNBOUNDED: i64 = -1;

    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset: Some(offset),
            limit: Some(limit),
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build a page from caller integers where `-1` means unbounded
    pub fn from_sentinel(offset: i64, limit: i64) -> Result<Self> {
        Ok(Self {
            offset: sentinel("offset", offset)?,
            limit: sentinel("limit", limit)?,
        })
    }
}

fn sentinel(name: &str, value: i64) -> Result<Option<u32>> {
    if value == Page::UNBOUNDED {
        return Ok(None);
    }
    u32::try_from(value).map(Some).map_err(|_| {
        Error::InvalidInput(format!(
            "{} must be between 0 and {} or -1, got {}",
            name,
            u32::MAX,
            value
        ))
    })
}

/// One listed row: a principal and the value it was sorted by
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub principal: Principal,
    pub sort_key: Option<String>,
}

/// Paged search result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Distinct principals matching the filters
    pub total_size: i64,
    pub principals: Vec<Principal>,
}

/// Paged index result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResponse {
    /// Distinct values matching the filters and the value pattern
    pub total_size: i64,
    pub values: Vec<String>,
}
