//! Check selection and the bookkeeping-set exclusion predicate.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Which of the six discrepancy categories to report, plus an optional schema
/// namespace filter.
///
/// The defaults report everything the model assumes but the database lacks, and
/// ignore database objects the model does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckOptions {
    /// Empty means every schema is considered.
    pub schema_name: String,
    pub tables_in_database_but_not_in_model: bool,
    pub tables_in_model_but_not_in_database: bool,
    pub columns_in_database_but_not_in_model: bool,
    pub columns_in_model_but_not_in_database: bool,
    pub relationships_in_database_but_not_in_model: bool,
    pub relationships_in_model_but_not_in_database: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            schema_name: String::new(),
            tables_in_database_but_not_in_model: false,
            tables_in_model_but_not_in_database: true,
            columns_in_database_but_not_in_model: false,
            columns_in_model_but_not_in_database: true,
            relationships_in_database_but_not_in_model: false,
            relationships_in_model_but_not_in_database: true,
        }
    }
}

impl CheckOptions {
    /// Default checks restricted to one schema.
    pub fn for_schema(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            ..Self::default()
        }
    }

    /// All six checks enabled.
    pub fn strict() -> Self {
        Self {
            tables_in_database_but_not_in_model: true,
            columns_in_database_but_not_in_model: true,
            relationships_in_database_but_not_in_model: true,
            ..Self::default()
        }
    }

    pub fn with_schema(mut self, schema_name: impl Into<String>) -> Self {
        self.schema_name = schema_name.into();
        self
    }

    pub fn with_tables(mut self, in_database_but_not_in_model: bool, in_model_but_not_in_database: bool) -> Self {
        self.tables_in_database_but_not_in_model = in_database_but_not_in_model;
        self.tables_in_model_but_not_in_database = in_model_but_not_in_database;
        self
    }

    pub fn with_columns(mut self, in_database_but_not_in_model: bool, in_model_but_not_in_database: bool) -> Self {
        self.columns_in_database_but_not_in_model = in_database_but_not_in_model;
        self.columns_in_model_but_not_in_database = in_model_but_not_in_database;
        self
    }

    pub fn with_relationships(
        mut self,
        in_database_but_not_in_model: bool,
        in_model_but_not_in_database: bool,
    ) -> Self {
        self.relationships_in_database_but_not_in_model = in_database_but_not_in_model;
        self.relationships_in_model_but_not_in_database = in_model_but_not_in_database;
        self
    }

    /// The schema filter, or `None` when all schemas are in scope.
    pub fn schema_filter(&self) -> Option<&str> {
        let trimmed = self.schema_name.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    pub fn includes_schema(&self, schema_name: &str) -> bool {
        self.schema_filter().is_none_or(|filter| filter == schema_name)
    }
}

/// Predicate for internal bookkeeping entity sets that never take part in a
/// check.
#[derive(Debug, Clone)]
pub struct ExclusionPredicate {
    patterns: Vec<Regex>,
}

impl ExclusionPredicate {
    pub const DEFAULT_PATTERN: &'static str = "^EdmMetadatas$";

    /// Excludes nothing.
    pub fn none() -> Self {
        Self { patterns: Vec::new() }
    }

    pub fn from_patterns<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.patterns.push(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(name))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }
}

impl Default for ExclusionPredicate {
    fn default() -> Self {
        let patterns = Regex::new(Self::DEFAULT_PATTERN).map(|p| vec![p]).unwrap_or_default();
        Self { patterns }
    }
}
