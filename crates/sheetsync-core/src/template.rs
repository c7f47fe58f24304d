//! Template model
//!
//! A [`Template`] is the parsed form of a workbook attached to a product
//! classification. The first sheet is the main sheet that gets copied into
//! every line sheet; the remaining sheets are auxiliary reference sheets
//! shared by the whole document.

use crate::cell::CellAddress;
use crate::error::{Error, Result};
use crate::validation::WorkbookValidation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of a template classification (product category)
pub type ClassificationId = String;

/// A parsed, read-only template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Classification this template is attached to
    pub classification: ClassificationId,
    /// Sheets in workbook order; the first one is the main sheet
    pub sheets: Vec<TemplateSheet>,
}

impl Template {
    /// Create a template from its sheets
    pub fn new<S: Into<String>>(classification: S, sheets: Vec<TemplateSheet>) -> Self {
        Self {
            classification: classification.into(),
            sheets,
        }
    }

    /// The main sheet
    pub fn main_sheet(&self) -> Result<&TemplateSheet> {
        self.sheets
            .first()
            .ok_or_else(|| Error::EmptyTemplate(self.classification.clone()))
    }

    /// Every sheet after the main one
    pub fn auxiliary_sheets(&self) -> &[TemplateSheet] {
        self.sheets.get(1..).unwrap_or(&[])
    }

    /// Names of all template sheets, in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Parse a template from JSON
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Content of one template cell: a literal value or a formula starting with `=`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCell {
    pub content: String,
}

impl TemplateCell {
    pub fn is_formula(&self) -> bool {
        self.content.starts_with('=')
    }
}

impl From<&str> for TemplateCell {
    fn from(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }
}

impl From<String> for TemplateCell {
    fn from(content: String) -> Self {
        Self { content }
    }
}

/// One sheet of a template
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSheet {
    /// Stable id; auxiliary sheets keep it in the document
    pub id: String,
    /// Display name as it appears in the workbook
    pub name: String,
    /// Cell content keyed by A1 address
    #[serde(default)]
    pub cells: BTreeMap<String, TemplateCell>,
    /// Merged regions in A1 range form
    #[serde(default)]
    pub merges: Vec<String>,
    /// Column widths in workbook character units
    #[serde(default)]
    pub column_sizes: BTreeMap<u16, f64>,
    /// Row heights in points
    #[serde(default)]
    pub row_sizes: BTreeMap<u32, f64>,
    #[serde(default)]
    pub validations: Vec<WorkbookValidation>,
    /// Explicit auxiliary role; overrides keyword ranking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<AuxiliaryRole>,
}

impl TemplateSheet {
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the content of a cell
    pub fn with_cell<C: Into<String>>(mut self, address: &str, content: C) -> Self {
        self.cells.insert(
            address.to_string(),
            TemplateCell {
                content: content.into(),
            },
        );
        self
    }

    pub fn with_merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }

    pub fn with_column_size(mut self, col: u16, width: f64) -> Self {
        self.column_sizes.insert(col, width);
        self
    }

    pub fn with_row_size(mut self, row: u32, height: f64) -> Self {
        self.row_sizes.insert(row, height);
        self
    }

    pub fn with_validation(mut self, validation: WorkbookValidation) -> Self {
        self.validations.push(validation);
        self
    }

    pub fn with_role(mut self, role: AuxiliaryRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Iterate over cells with a parseable address, in row-major order.
    ///
    /// Entries whose key is not a valid A1 address are returned as errors so
    /// that callers can log and skip them.
    pub fn cells_by_address(
        &self,
    ) -> Vec<(std::result::Result<CellAddress, String>, &TemplateCell)> {
        let mut cells: Vec<_> = self
            .cells
            .iter()
            .map(|(key, cell)| (CellAddress::parse(key).map_err(|_| key.clone()), cell))
            .collect();
        cells.sort_by_key(|(addr, _)| match addr {
            Ok(a) => (0, a.row, a.col),
            Err(_) => (1, 0, 0),
        });
        cells
    }
}

/// Ranking role of an auxiliary sheet
///
/// Auxiliary sheets are created in role order so that a sheet is always
/// present before the sheets that look values up in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuxiliaryRole {
    /// Summary / costing sheet
    Summary,
    /// Profile or other reference master data
    Reference,
    /// Material tables (resin)
    Material,
    Helper,
    Unranked,
}

/// Order in which auxiliary roles are created and the name keywords that
/// select a role when a sheet carries no explicit one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxiliaryPriority {
    /// Creation order; roles not listed rank after every listed role
    pub order: Vec<AuxiliaryRole>,
    /// Lowercase keywords per role, checked in `order`
    pub keywords: BTreeMap<AuxiliaryRole, Vec<String>>,
}

impl Default for AuxiliaryPriority {
    fn default() -> Self {
        let keywords = [
            (AuxiliaryRole::Summary, vec!["merged sheet", "costing"]),
            (AuxiliaryRole::Reference, vec!["profile master", "profile"]),
            (AuxiliaryRole::Material, vec!["resin"]),
            (AuxiliaryRole::Helper, vec!["helper"]),
        ]
        .into_iter()
        .map(|(role, words)| (role, words.into_iter().map(String::from).collect()))
        .collect();

        Self {
            order: vec![
                AuxiliaryRole::Summary,
                AuxiliaryRole::Reference,
                AuxiliaryRole::Material,
                AuxiliaryRole::Helper,
            ],
            keywords,
        }
    }
}

impl AuxiliaryPriority {
    /// Role of a template sheet: the explicit role, else keyword match on the name
    pub fn role_of(&self, sheet: &TemplateSheet) -> AuxiliaryRole {
        if let Some(role) = sheet.role {
            return role;
        }
        let name = sheet.name.to_lowercase();
        self.order
            .iter()
            .find(|role| {
                self.keywords
                    .get(*role)
                    .is_some_and(|words| words.iter().any(|w| name.contains(w.as_str())))
            })
            .copied()
            .unwrap_or(AuxiliaryRole::Unranked)
    }

    /// Position of a role in the creation order
    pub fn rank(&self, role: AuxiliaryRole) -> usize {
        self.order
            .iter()
            .position(|r| *r == role)
            .unwrap_or(self.order.len())
    }

    /// Rank of a template sheet
    pub fn rank_of(&self, sheet: &TemplateSheet) -> usize {
        self.rank(self.role_of(sheet))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_main_and_auxiliary_split() {
        let template = Template::new(
            "windows",
            vec![
                TemplateSheet::new("main", "Costing"),
                TemplateSheet::new("profile_master", "Profile Master"),
            ],
        );
        assert_eq!(template.main_sheet().unwrap().name, "Costing");
        assert_eq!(template.auxiliary_sheets().len(), 1);

        let empty = Template::new("none", Vec::new());
        assert!(empty.main_sheet().is_err());
        assert!(empty.auxiliary_sheets().is_empty());
    }

    #[test]
    fn test_keyword_roles() {
        let priority = AuxiliaryPriority::default();
        let role = |name: &str| priority.role_of(&TemplateSheet::new("x", name));

        assert_eq!(role("Merged Sheet"), AuxiliaryRole::Summary);
        assert_eq!(role("Profile Master"), AuxiliaryRole::Reference);
        assert_eq!(role("RESIN prices"), AuxiliaryRole::Material);
        assert_eq!(role("helper"), AuxiliaryRole::Helper);
        assert_eq!(role("Notes"), AuxiliaryRole::Unranked);
    }

    #[test]
    fn test_explicit_role_wins() {
        let priority = AuxiliaryPriority::default();
        let sheet = TemplateSheet::new("x", "Helper").with_role(AuxiliaryRole::Reference);
        assert_eq!(priority.rank_of(&sheet), 1);
        assert_eq!(priority.rank(AuxiliaryRole::Unranked), 4);
    }

    #[test]
    fn test_cells_by_address_sorted_and_flagged() {
        let sheet = TemplateSheet::new("main", "Main")
            .with_cell("B2", "x")
            .with_cell("A10", "y")
            .with_cell("A1", "z")
            .with_cell("bogus!", "w");
        let order: Vec<_> = sheet
            .cells_by_address()
            .into_iter()
            .map(|(addr, _)| addr.map(|a| a.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                Ok("A1".to_string()),
                Ok("B2".to_string()),
                Ok("A10".to_string()),
                Err("bogus!".to_string()),
            ]
        );
    }

    #[test]
    fn test_template_from_json() {
        let template = Template::from_json(
            r#"{
                "classification": "7",
                "sheets": [{
                    "id": "main",
                    "name": "Costing",
                    "cells": { "A1": { "content": "=B1*2" } },
                    "merges": ["A1:B1"],
                    "columnSizes": { "0": 12.5 },
                    "rowSizes": { "3": 20.0 }
                }]
            }"#,
        )
        .unwrap();
        let main = template.main_sheet().unwrap();
        assert!(main.cells["A1"].is_formula());
        assert_eq!(main.column_sizes[&0], 12.5);
        assert_eq!(main.row_sizes[&3], 20.0);
        assert!(main.role.is_none());
    }
}
