//! Statement rendering with named placeholders
//!
//! Fragments are written with named placeholders and rendered as positional
//! `?` markers. Names are resolved against [`Bindings`] once the statement is
//! complete, so the order values are bound in always matches the text.

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// A value bound to a placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
}

impl SqlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Integer(_) => None,
        }
    }
}

/// Named parameter values for one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    values: BTreeMap<String, SqlValue>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values
            .insert(name.into(), SqlValue::Text(value.into()));
        self
    }

    pub fn integer(&mut self, name: impl Into<String>, value: i64) -> &mut Self {
        self.values.insert(name.into(), SqlValue::Integer(value));
        self
    }

    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.values.get(name)
    }

    pub fn extend(&mut self, other: Bindings) {
        self.values.extend(other.values);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Accumulates statement text and the placeholder names in textual order
#[derive(Debug, Default)]
pub struct SqlWriter {
    sql: String,
    placeholders: Vec<String>,
}

impl SqlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    pub fn placeholder(&mut self, name: impl Into<String>) -> &mut Self {
        self.sql.push('?');
        self.placeholders.push(name.into());
        self
    }

    pub fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            placeholders: self.placeholders,
        }
    }
}

/// Rendered statement whose placeholders are still unbound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    placeholders: Vec<String>,
}

impl Statement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names in the order they appear in the text
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Resolve every placeholder against `bindings`
    pub fn bind(self, bindings: &Bindings) -> Result<BoundStatement> {
        let values = self
            .placeholders
            .iter()
            .map(|name| {
                bindings
                    .get(name)
                    .cloned()
                    .ok_or_else(|| Error::UnboundParameter(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BoundStatement {
            sql: self.sql,
            values,
        })
    }
}

/// Statement text plus positional values, ready for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}
