//! Collaborative document model
//!
//! A [`Document`] is the shared state one parent entity's sheets live in. It
//! applies batches of [`MutationCommand`]s atomically: either every command of
//! a batch applies, or the document is left untouched.

use crate::cell::{CellAddress, CellRange};
use crate::command::{Axis, Criterion, MutationCommand};
use crate::error::{Error, Result};
use crate::record::RecordId;
use crate::template::ClassificationId;
use crate::MAX_SHEET_NAME_LEN;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const LINE_SHEET_PREFIX: &str = "sheet_";

/// Identifier of a sheet inside a document
///
/// Line sheets derive their id from the record they represent
/// (`sheet_<record id>`); auxiliary sheets keep their template id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SheetId(pub String);

impl SheetId {
    /// Id of the line sheet representing `record`
    pub fn for_record(record: &RecordId) -> Self {
        SheetId(format!("{LINE_SHEET_PREFIX}{record}"))
    }

    /// Record a line sheet id was derived from
    pub fn record_id(&self) -> Option<RecordId> {
        self.0
            .strip_prefix(LINE_SHEET_PREFIX)
            .filter(|rest| !rest.is_empty())
            .map(RecordId::from)
    }

    pub fn is_line(&self) -> bool {
        self.record_id().is_some()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SheetId {
    fn from(id: &str) -> Self {
        SheetId(id.to_string())
    }
}

/// List binding id of the record a line sheet represents
pub fn list_id_for(record: &RecordId) -> String {
    record.to_string()
}

/// Clamp a display name to a valid sheet name
pub fn sheet_name_for(display_name: &str, fallback: &str) -> String {
    let trimmed = display_name.trim();
    let name = if trimmed.is_empty() { fallback } else { trimmed };
    name.chars().take(MAX_SHEET_NAME_LEN).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SheetKind {
    Line,
    Auxiliary,
}

/// A dropdown rule materialized on one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRule {
    pub rule_id: String,
    pub target_cell: String,
    pub criterion: Criterion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub range: CellRange,
    pub style: String,
}

/// A materialized sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub id: SheetId,
    pub name: String,
    pub kind: SheetKind,
    /// Cell content keyed by relative A1 address
    cells: BTreeMap<String, String>,
    merges: Vec<CellRange>,
    rules: Vec<ValidationRule>,
    column_sizes: BTreeMap<u32, f64>,
    row_sizes: BTreeMap<u32, f64>,
    tables: Vec<Table>,
}

impl Sheet {
    fn new(id: SheetId, name: String) -> Self {
        let kind = if id.is_line() {
            SheetKind::Line
        } else {
            SheetKind::Auxiliary
        };
        Self {
            id,
            name,
            kind,
            cells: BTreeMap::new(),
            merges: Vec::new(),
            rules: Vec::new(),
            column_sizes: BTreeMap::new(),
            row_sizes: BTreeMap::new(),
            tables: Vec::new(),
        }
    }

    pub fn is_auxiliary(&self) -> bool {
        self.kind == SheetKind::Auxiliary
    }

    /// Content of a cell
    pub fn cell(&self, addr: CellAddress) -> Option<&str> {
        self.cells.get(&addr.relative().to_a1_string()).map(String::as_str)
    }

    /// Content of a cell given in A1 notation
    pub fn cell_a1(&self, address: &str) -> Result<Option<&str>> {
        Ok(self.cell(CellAddress::parse(address)?))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn merges(&self) -> &[CellRange] {
        &self.merges
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn column_size(&self, col: u32) -> Option<f64> {
        self.column_sizes.get(&col).copied()
    }

    pub fn row_size(&self, row: u32) -> Option<f64> {
        self.row_sizes.get(&row).copied()
    }
}

/// Binding between a record and the tabular region of its line sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBinding {
    pub list_id: String,
    pub record_id: RecordId,
    pub sheet_id: SheetId,
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationId>,
}

/// The shared document of one parent entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    sheets: Vec<Sheet>,
    bindings: IndexMap<String, ListBinding>,
    revision: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_sheet: Option<SheetId>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Revision counter, bumped by every applied batch
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Sheets in tab order
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheet(&self, id: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.id.as_str() == id)
    }

    pub fn contains_sheet(&self, id: &str) -> bool {
        self.sheet_index(id).is_some()
    }

    /// Sheet ids in tab order
    pub fn sheet_ids(&self) -> Vec<SheetId> {
        self.sheets.iter().map(|s| s.id.clone()).collect()
    }

    /// Sheet names in tab order
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn bindings(&self) -> impl Iterator<Item = &ListBinding> {
        self.bindings.values()
    }

    pub fn binding(&self, list_id: &str) -> Option<&ListBinding> {
        self.bindings.get(list_id)
    }

    /// The binding attached to a sheet, if any
    pub fn binding_for_sheet(&self, sheet_id: &str) -> Option<&ListBinding> {
        self.bindings
            .values()
            .find(|b| b.sheet_id.as_str() == sheet_id)
    }

    /// Sheet shown first when the document is opened
    pub fn active_sheet(&self) -> Option<&SheetId> {
        self.active_sheet.as_ref()
    }

    fn sheet_index(&self, id: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.id.as_str() == id)
    }

    fn sheet_mut(&mut self, id: &str) -> Result<&mut Sheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.id.as_str() == id)
            .ok_or_else(|| Error::UnknownSheet(id.to_string()))
    }

    /// Apply a batch atomically.
    ///
    /// On error the document is unchanged and the revision is not bumped.
    pub fn apply(&mut self, commands: &[MutationCommand]) -> Result<()> {
        let mut next = self.clone();
        for command in commands {
            next.apply_one(command)?;
        }
        next.revision += 1;
        next.active_sheet = next
            .sheets
            .iter()
            .find(|s| s.kind == SheetKind::Line)
            .or_else(|| next.sheets.first())
            .map(|s| s.id.clone());
        *self = next;
        Ok(())
    }

    fn apply_one(&mut self, command: &MutationCommand) -> Result<()> {
        match command {
            MutationCommand::CreateSheet {
                sheet_id,
                name,
                position,
            } => {
                if self.contains_sheet(sheet_id) {
                    return Err(Error::DuplicateSheet(sheet_id.clone()));
                }
                validate_sheet_name(name)?;
                let position = (*position).min(self.sheets.len());
                self.sheets.insert(
                    position,
                    Sheet::new(SheetId(sheet_id.clone()), name.clone()),
                );
            }
            MutationCommand::DeleteSheet { sheet_id } => {
                let index = self
                    .sheet_index(sheet_id)
                    .ok_or_else(|| Error::UnknownSheet(sheet_id.clone()))?;
                self.sheets.remove(index);
            }
            MutationCommand::UpdateCell {
                sheet_id,
                col,
                row,
                content,
            } => {
                let key = CellAddress::new(*row, *col).to_a1_string();
                let sheet = self.sheet_mut(sheet_id)?;
                if content.is_empty() {
                    sheet.cells.remove(&key);
                } else {
                    sheet.cells.insert(key, content.clone());
                }
            }
            MutationCommand::AddMerge { sheet_id, range } => {
                let sheet = self.sheet_mut(sheet_id)?;
                if !sheet.merges.contains(range) {
                    sheet.merges.push(*range);
                }
            }
            MutationCommand::ResizeDimension {
                sheet_id,
                axis,
                index,
                size,
            } => {
                let sheet = self.sheet_mut(sheet_id)?;
                match axis {
                    Axis::Col => sheet.column_sizes.insert(*index, *size),
                    Axis::Row => sheet.row_sizes.insert(*index, *size),
                };
            }
            MutationCommand::CreateTable {
                sheet_id,
                range,
                style,
            } => {
                let sheet = self.sheet_mut(sheet_id)?;
                sheet.tables.push(Table {
                    range: *range,
                    style: style.clone(),
                });
            }
            MutationCommand::RegisterListBinding {
                list_id,
                record_id,
                columns,
                sheet_id,
                classification,
            } => {
                if !self.contains_sheet(sheet_id) {
                    return Err(Error::UnknownSheet(sheet_id.clone()));
                }
                self.bindings.insert(
                    list_id.clone(),
                    ListBinding {
                        list_id: list_id.clone(),
                        record_id: RecordId::from(record_id.as_str()),
                        sheet_id: SheetId(sheet_id.clone()),
                        columns: columns.clone(),
                        classification: classification.clone(),
                    },
                );
            }
            MutationCommand::UnregisterListBinding { list_id } => {
                self.bindings
                    .shift_remove(list_id)
                    .ok_or_else(|| Error::UnknownBinding(list_id.clone()))?;
            }
            MutationCommand::AddValidationRule {
                sheet_id,
                rule_id,
                target_cell,
                criterion,
            } => {
                let sheet = self.sheet_mut(sheet_id)?;
                sheet.rules.push(ValidationRule {
                    rule_id: rule_id.clone(),
                    target_cell: target_cell.clone(),
                    criterion: criterion.clone(),
                });
            }
        }
        Ok(())
    }
}

fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidSheetName("Sheet name cannot be empty".into()));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::InvalidSheetName(format!(
            "Sheet name too long (max {} characters)",
            MAX_SHEET_NAME_LEN
        )));
    }
    Ok(())
}
