//! Mutation commands
//!
//! The wire vocabulary sent to a collaborative document session. Commands
//! serialize as JSON objects tagged by `type` with camelCase fields.

use crate::cell::{CellAddress, CellRange};
use crate::template::ClassificationId;
use serde::{Deserialize, Serialize};

/// Axis of a dimension resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Axis {
    Col,
    Row,
}

/// Criterion of a dropdown validation rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    /// Value must be one of an explicit set
    ValueInSet(Vec<String>),
    /// Value must appear in a range, always `'Sheet'!A1:B2` form
    ValueInRange(String),
}

/// One structural mutation of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum MutationCommand {
    CreateSheet {
        sheet_id: String,
        name: String,
        position: usize,
    },
    DeleteSheet {
        sheet_id: String,
    },
    UpdateCell {
        sheet_id: String,
        col: u16,
        row: u32,
        content: String,
    },
    AddMerge {
        sheet_id: String,
        range: CellRange,
    },
    ResizeDimension {
        sheet_id: String,
        axis: Axis,
        index: u32,
        size: f64,
    },
    CreateTable {
        sheet_id: String,
        range: CellRange,
        style: String,
    },
    RegisterListBinding {
        list_id: String,
        record_id: String,
        columns: Vec<String>,
        sheet_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        classification: Option<ClassificationId>,
    },
    UnregisterListBinding {
        list_id: String,
    },
    AddValidationRule {
        sheet_id: String,
        rule_id: String,
        target_cell: String,
        criterion: Criterion,
    },
}

impl MutationCommand {
    /// Build an `UpdateCell` at a zero-based address
    pub fn update_cell<S: Into<String>, C: Into<String>>(
        sheet_id: S,
        at: CellAddress,
        content: C,
    ) -> Self {
        MutationCommand::UpdateCell {
            sheet_id: sheet_id.into(),
            col: at.col,
            row: at.row,
            content: content.into(),
        }
    }

    /// Sheet the command addresses, if any
    pub fn sheet_id(&self) -> Option<&str> {
        match self {
            MutationCommand::CreateSheet { sheet_id, .. }
            | MutationCommand::DeleteSheet { sheet_id }
            | MutationCommand::UpdateCell { sheet_id, .. }
            | MutationCommand::AddMerge { sheet_id, .. }
            | MutationCommand::ResizeDimension { sheet_id, .. }
            | MutationCommand::CreateTable { sheet_id, .. }
            | MutationCommand::RegisterListBinding { sheet_id, .. }
            | MutationCommand::AddValidationRule { sheet_id, .. } => Some(sheet_id),
            MutationCommand::UnregisterListBinding { .. } => None,
        }
    }

    /// Short name of the variant, used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            MutationCommand::CreateSheet { .. } => "CreateSheet",
            MutationCommand::DeleteSheet { .. } => "DeleteSheet",
            MutationCommand::UpdateCell { .. } => "UpdateCell",
            MutationCommand::AddMerge { .. } => "AddMerge",
            MutationCommand::ResizeDimension { .. } => "ResizeDimension",
            MutationCommand::CreateTable { .. } => "CreateTable",
            MutationCommand::RegisterListBinding { .. } => "RegisterListBinding",
            MutationCommand::UnregisterListBinding { .. } => "UnregisterListBinding",
            MutationCommand::AddValidationRule { .. } => "AddValidationRule",
        }
    }
}
