//! Backing records and the column policy
//!
//! A [`BackingRecord`] is the external row a line sheet represents. Its
//! visible columns are decided by [`ColumnPolicy::expected_columns`], which is
//! the one rule used both when a sheet is built and when an existing sheet is
//! compared against its record.

use crate::template::ClassificationId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Stable identifier of a backing record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId(id)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        RecordId(id.to_string())
    }
}

/// Value of a static record field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Text shown in a bound cell; null and `false` render empty
    pub fn to_cell_text(&self) -> String {
        match self {
            FieldValue::Null | FieldValue::Bool(false) => String::new(),
            FieldValue::Bool(true) => "TRUE".to_string(),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                format!("{}", *n as i64)
            }
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }

    /// Interpret text typed into a cell, keeping the variant of `self`
    pub fn reinterpret(&self, text: &str) -> FieldValue {
        let text = text.trim();
        match self {
            FieldValue::Number(_) => text
                .parse::<f64>()
                .map(FieldValue::Number)
                .unwrap_or_else(|_| FieldValue::Text(text.to_string())),
            FieldValue::Bool(_) => match text.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => FieldValue::Bool(true),
                "" | "false" | "0" | "no" => FieldValue::Bool(false),
                _ => FieldValue::Text(text.to_string()),
            },
            FieldValue::Null if text.is_empty() => FieldValue::Null,
            _ => FieldValue::Text(text.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// External row represented by one line sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackingRecord {
    pub id: RecordId,
    /// Template classification; `None` when the record has no template
    #[serde(default)]
    pub classification: Option<ClassificationId>,
    #[serde(default)]
    pub display_name: String,
    /// Fields of the fixed record schema, in schema order
    #[serde(default)]
    pub static_fields: IndexMap<String, FieldValue>,
    /// Free-form configuration attributes
    #[serde(default)]
    pub dynamic_attributes: IndexMap<String, String>,
    /// Attribute names in the order the product configuration declares them
    #[serde(default)]
    pub attribute_priority: Vec<String>,
}

impl BackingRecord {
    pub fn new<I: Into<RecordId>>(id: I) -> Self {
        Self {
            id: id.into(),
            classification: None,
            display_name: String::new(),
            static_fields: IndexMap::new(),
            dynamic_attributes: IndexMap::new(),
            attribute_priority: Vec::new(),
        }
    }

    pub fn with_classification<S: Into<String>>(mut self, classification: S) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_field<K: Into<String>, V: Into<FieldValue>>(mut self, key: K, value: V) -> Self {
        self.static_fields.insert(key.into(), value.into());
        self
    }

    pub fn with_attribute<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        let key = key.into();
        if !self.attribute_priority.contains(&key) {
            self.attribute_priority.push(key.clone());
        }
        self.dynamic_attributes.insert(key, value.into());
        self
    }

    /// Display text of a column: static schema first, then dynamic attributes
    pub fn value_of(&self, column: &str) -> String {
        if let Some(value) = self.static_fields.get(column) {
            return value.to_cell_text();
        }
        self.dynamic_attributes
            .get(column)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether `column` names a static field
    pub fn is_static(&self, column: &str) -> bool {
        self.static_fields.contains_key(column)
    }
}

/// Decides which columns a record's line sheet exposes, and in what order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColumnPolicy {
    /// Leading static columns
    pub base_columns: Vec<String>,
    /// Attribute names never exposed
    pub dropped_attributes: Vec<String>,
    /// Attribute name → base column it duplicates; the attribute is hidden
    pub base_aliases: IndexMap<String, String>,
    /// Base column → attribute placed directly after it
    pub companions: IndexMap<String, String>,
    /// Suffix of a unit-of-measure companion attribute (`"<name> UOM"`)
    pub unit_suffix: String,
}

impl Default for ColumnPolicy {
    fn default() -> Self {
        Self {
            base_columns: vec!["product_template_id".into(), "quantity".into()],
            dropped_attributes: vec!["UOM".into()],
            base_aliases: IndexMap::from([("Quantity".to_string(), "quantity".to_string())]),
            companions: IndexMap::from([("quantity".to_string(), "Quantity UOM".to_string())]),
            unit_suffix: " UOM".into(),
        }
    }
}

impl ColumnPolicy {
    /// Ordered, de-duplicated column list for a record
    ///
    /// # Example
    /// ```
    /// use sheetsync_core::{BackingRecord, ColumnPolicy};
    ///
    /// let record = BackingRecord::new(1)
    ///     .with_attribute("Width", "1200")
    ///     .with_attribute("Width UOM", "mm")
    ///     .with_attribute("Quantity UOM", "pcs")
    ///     .with_attribute("Color", "white");
    /// let columns = ColumnPolicy::default().expected_columns(&record);
    /// assert_eq!(
    ///     columns,
    ///     ["product_template_id", "quantity", "Quantity UOM", "Width", "Width UOM", "Color"]
    /// );
    /// ```
    pub fn expected_columns(&self, record: &BackingRecord) -> Vec<String> {
        let base: BTreeSet<&str> = self.base_columns.iter().map(String::as_str).collect();
        let mut remaining: BTreeSet<&str> = record
            .dynamic_attributes
            .keys()
            .map(String::as_str)
            .filter(|name| {
                !base.contains(name)
                    && !self.dropped_attributes.iter().any(|d| d == name)
                    && !self.base_aliases.contains_key(*name)
            })
            .collect();

        let mut columns: Vec<String> = Vec::with_capacity(base.len() + remaining.len());
        for column in &self.base_columns {
            columns.push(column.clone());
            if let Some(companion) = self.companions.get(column) {
                if remaining.remove(companion.as_str()) {
                    columns.push(companion.clone());
                }
            }
        }

        for name in &record.attribute_priority {
            if remaining.remove(name.as_str()) {
                columns.push(name.clone());
                let unit = format!("{name}{}", self.unit_suffix);
                if remaining.remove(unit.as_str()) {
                    columns.push(unit);
                }
            }
        }

        // BTreeSet iterates in lexicographic order
        columns.extend(remaining.into_iter().map(String::from));
        columns
    }
}
