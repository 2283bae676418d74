//! Search and index requests built from query-parameter pairs
//!
//! Reserved parameters start with an underscore; every other parameter is a
//! filter. Repeating a filter parameter adds another AND-combined slot.

use super::entity::{OrderDirection, Page};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field name to the ordered list of raw values given for it
pub type Filters = BTreeMap<String, Vec<String>>;

pub const FIRST_PARAM: &str = "_first";
pub const MAX_PARAM: &str = "_max";
pub const ORDER_BY_PARAM: &str = "_orderBy";
pub const ORDER_DIRECT_PARAM: &str = "_orderDirect";
pub const LABEL_PARAM: &str = "_label";
pub const VALUE_PARAM: &str = "_value";

/// Pattern used when an index request has no `_value`
pub const MATCH_ALL: &str = "%";

/// Fallbacks for reserved parameters the caller left out
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDefaults {
    pub page_size: u32,
    pub order_by: String,
    pub direction: OrderDirection,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            page_size: 15,
            order_by: "username".to_string(),
            direction: OrderDirection::Asc,
        }
    }
}

/// A paged principal search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub filters: Filters,
    pub page: Page,
    pub order_by: String,
    pub direction: OrderDirection,
}

impl SearchRequest {
    /// Unfiltered first page under `defaults`
    pub fn new(defaults: &RequestDefaults) -> Self {
        Self {
            filters: Filters::new(),
            page: Page::new(0, defaults.page_size),
            order_by: defaults.order_by.clone(),
            direction: defaults.direction,
        }
    }

    /// Add one filter slot for `field`
    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters
            .entry(field.into())
            .or_default()
            .push(value.into());
        self
    }

    pub fn from_params<I, K, V>(params: I, defaults: &RequestDefaults) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = RawParams::collect(params, &[
            FIRST_PARAM,
            MAX_PARAM,
            ORDER_BY_PARAM,
            ORDER_DIRECT_PARAM,
        ]);

        Ok(Self {
            page: params.page(defaults)?,
            order_by: params
                .take(ORDER_BY_PARAM)
                .unwrap_or_else(|| defaults.order_by.clone()),
            direction: params.direction(defaults)?,
            filters: params.filters,
        })
    }
}

/// A paged distinct-value lookup for one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexRequest {
    pub label: String,
    pub value_pattern: String,
    pub filters: Filters,
    pub page: Page,
    pub direction: OrderDirection,
}

impl IndexRequest {
    /// Unfiltered first page of every value of `label`
    pub fn new(label: impl Into<String>, defaults: &RequestDefaults) -> Self {
        Self {
            label: label.into(),
            value_pattern: MATCH_ALL.to_string(),
            filters: Filters::new(),
            page: Page::new(0, defaults.page_size),
            direction: defaults.direction,
        }
    }

    pub fn from_params<I, K, V>(params: I, defaults: &RequestDefaults) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = RawParams::collect(params, &[
            FIRST_PARAM,
            MAX_PARAM,
            ORDER_DIRECT_PARAM,
            LABEL_PARAM,
            VALUE_PARAM,
        ]);

        let label = params
            .take(LABEL_PARAM)
            .ok_or_else(|| Error::InvalidInput(format!("{} is required", LABEL_PARAM)))?;

        Ok(Self {
            label,
            value_pattern: params
                .take(VALUE_PARAM)
                .unwrap_or_else(|| MATCH_ALL.to_string()),
            page: params.page(defaults)?,
            direction: params.direction(defaults)?,
            filters: params.filters,
        })
    }
}

/// Parameters split into reserved values and filters
struct RawParams {
    reserved: BTreeMap<String, String>,
    filters: Filters,
}

impl RawParams {
    fn collect<I, K, V>(params: I, reserved_names: &[&str]) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut reserved = BTreeMap::new();
        let mut filters = Filters::new();

        for (key, value) in params {
            let (key, value) = (key.into(), value.into());
            if reserved_names.contains(&key.as_str()) {
                // first occurrence wins
                reserved.entry(key).or_insert(value);
            } else {
                filters.entry(key).or_default().push(value);
            }
        }

        Self { reserved, filters }
    }

    /// Remove a reserved value; an empty value counts as absent
    fn take(&mut self, name: &str) -> Option<String> {
        self.reserved.remove(name).filter(|value| !value.is_empty())
    }

    fn integer(&mut self, name: &str) -> Result<Option<i64>> {
        self.take(name)
            .map(|raw| {
                raw.trim().parse::<i64>().map_err(|_| {
                    Error::InvalidInput(format!("{} must be an integer, got '{}'", name, raw))
                })
            })
            .transpose()
    }

    fn page(&mut self, defaults: &RequestDefaults) -> Result<Page> {
        let first = self.integer(FIRST_PARAM)?.unwrap_or(0);
        let max = self
            .integer(MAX_PARAM)?
            .unwrap_or_else(|| i64::from(defaults.page_size));
        Page::from_sentinel(first, max)
    }

    fn direction(&mut self, defaults: &RequestDefaults) -> Result<OrderDirection> {
        match self.take(ORDER_DIRECT_PARAM) {
            Some(raw) => raw.parse(),
            None => Ok(defaults.direction),
        }
    }
}
