//! Search terms and field classification
//!
//! A search term is one AND-combined constraint: a field label plus the
//! OR-set of values that satisfy it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved pseudo-field that filters and sorts by group membership
pub const GROUP_FIELD: &str = "group";

/// Case-fold a value for matching and ordering.
///
/// Stored text is folded by the same function when written, so comparisons
/// never depend on SQLite's ASCII-only `lower()`.
pub fn fold_case(value: &str) -> String {
    value.to_lowercase()
}

/// Built-in principal columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DefaultField {
    Id,
    Username,
    Email,
    FirstName,
    LastName,
}

impl DefaultField {
    /// Resolve a field name, if it names a built-in column.
    ///
    /// `id` must match exactly; the profile fields match case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "id" {
            return Some(Self::Id);
        }
        [Self::Username, Self::Email, Self::FirstName, Self::LastName]
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(name))
    }

    /// Field name as callers spell it
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Username => "username",
            Self::Email => "email",
            Self::FirstName => "firstName",
            Self::LastName => "lastName",
        }
    }

    /// Column name in the `principals` table
    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Username => "username",
            Self::Email => "email",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
        }
    }

    /// Column holding the case-folded value, compared and sorted on
    /// instead of `column`. Ids are stored folded already.
    pub fn folded_column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Username => "username_lower",
            Self::Email => "email_lower",
            Self::FirstName => "first_name_lower",
            Self::LastName => "last_name_lower",
        }
    }

    /// Get all built-in fields
    pub fn all() -> Vec<Self> {
        vec![
            Self::Id,
            Self::Username,
            Self::Email,
            Self::FirstName,
            Self::LastName,
        ]
    }
}

impl fmt::Display for DefaultField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a field name is resolved against the directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "category", content = "field", rename_all = "snake_case")]
pub enum FieldCategory {
    /// Built-in principal column
    Default(DefaultField),
    /// Group membership pseudo-field
    Group,
    /// EAV attribute with this exact name
    Attribute(String),
}

impl FieldCategory {
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default(_))
    }

    /// Short category name
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Default(_) => "default",
            Self::Group => "group",
            Self::Attribute(_) => "attribute",
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default(field) => write!(f, "default ({})", field),
            Self::Group => write!(f, "group"),
            Self::Attribute(name) => write!(f, "attribute ({})", name),
        }
    }
}

/// Classify a field name. Total: anything unrecognised is an attribute name.
pub fn classify(name: &str) -> FieldCategory {
    if name == GROUP_FIELD {
        return FieldCategory::Group;
    }
    match DefaultField::from_name(name) {
        Some(field) => FieldCategory::Default(field),
        None => FieldCategory::Attribute(name.to_string()),
    }
}

/// One field's OR-set of match values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerm {
    pub label: String,
    pub values: Vec<String>,
    pub is_default_label: bool,
}

impl SearchTerm {
    pub fn new(label: impl Into<String>, values: Vec<String>) -> Self {
        let label = label.into();
        let is_default_label = classify(&label).is_default();
        Self {
            label,
            values,
            is_default_label,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_empty() || self.values.is_empty()
    }
}

/// Search terms keyed by `label + slot index`
///
/// The key doubles as the prefix of every placeholder the term renders, so
/// keys must stay unique within one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTermMap {
    terms: BTreeMap<String, SearchTerm>,
}

impl SearchTermMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, term: SearchTerm) -> Option<SearchTerm> {
        self.terms.insert(key.into(), term)
    }

    pub fn get(&self, key: &str) -> Option<&SearchTerm> {
        self.terms.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SearchTerm)> {
        self.terms.iter().map(|(key, term)| (key.as_str(), term))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.terms.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// True when any term filters on a group or an attribute
    pub fn has_non_default_labels(&self) -> bool {
        self.terms.values().any(|term| !term.is_default_label)
    }
}
