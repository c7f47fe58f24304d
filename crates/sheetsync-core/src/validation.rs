//! Workbook data validation
//!
//! Dropdown rules as they come out of a template workbook. A rule applies to
//! one or more ranges and draws its allowed values either from a literal list
//! or from a range on some sheet.
//!
//! ## Example
//!
//! ```rust
//! use sheetsync_core::{ValidationSource, WorkbookValidation};
//!
//! let rule = WorkbookValidation::from_formula(&["A2:A3"], "\"Yes,No\"");
//! assert_eq!(
//!     rule.source,
//!     ValidationSource::Literal(vec!["Yes".into(), "No".into()])
//! );
//!
//! let rule = WorkbookValidation::from_formula(&["B2"], "='Profile Master'!$A$2:$A$50");
//! assert_eq!(
//!     rule.source,
//!     ValidationSource::Range("'Profile Master'!$A$2:$A$50".into())
//! );
//! ```

use serde::{Deserialize, Serialize};

/// Data validation rule attached to a template sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookValidation {
    /// A1 ranges this validation applies to, in template coordinates.
    /// Kept as text; unreadable entries are dropped when the rule is expanded.
    pub ranges: Vec<String>,
    /// Where the allowed values come from
    pub source: ValidationSource,
}

/// Source of the allowed values of a list validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum ValidationSource {
    /// Explicit values, already split and trimmed
    #[serde(rename = "literalList")]
    Literal(Vec<String>),
    /// A range reference such as `'Profile Master'!A2:A50`, without the leading `=`
    #[serde(rename = "rangeReference")]
    Range(String),
}

impl ValidationSource {
    /// Classify a raw workbook `formula1` string.
    ///
    /// Quoted text is a literal list. Unquoted text containing a comma and not
    /// starting with `=` is a literal list too. Anything starting with `=`, or
    /// containing a `!` sheet separator, is a range reference. What remains is
    /// a single literal value.
    pub fn classify(raw: &str) -> Self {
        let raw = raw.trim();
        let quoted = raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"');

        if quoted {
            return ValidationSource::Literal(split_literal(&raw[1..raw.len() - 1]));
        }
        if raw.contains(',') && !raw.starts_with('=') {
            return ValidationSource::Literal(split_literal(raw));
        }
        if let Some(reference) = raw.strip_prefix('=') {
            return ValidationSource::Range(reference.trim().to_string());
        }
        if raw.contains('!') {
            return ValidationSource::Range(raw.to_string());
        }
        ValidationSource::Literal(split_literal(raw))
    }

    /// Returns `true` for literal lists
    pub fn is_literal(&self) -> bool {
        matches!(self, ValidationSource::Literal(_))
    }
}

fn split_literal(text: &str) -> Vec<String> {
    text.split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

impl WorkbookValidation {
    /// Create a literal-list validation
    pub fn literal<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ranges: Vec::new(),
            source: ValidationSource::Literal(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Create a range-reference validation
    pub fn range_reference<S: Into<String>>(reference: S) -> Self {
        Self {
            ranges: Vec::new(),
            source: ValidationSource::Range(reference.into()),
        }
    }

    /// Build from workbook ranges (A1 text) and a raw `formula1` string
    pub fn from_formula(ranges: &[&str], formula1: &str) -> Self {
        Self {
            ranges: ranges.iter().map(|r| r.to_string()).collect(),
            source: ValidationSource::classify(formula1),
        }
    }

    /// Add a range (A1 text) to this validation
    pub fn with_range<S: Into<String>>(mut self, range: S) -> Self {
        self.ranges.push(range.into());
        self
    }
}
