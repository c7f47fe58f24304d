//! Auxiliary sheets
//!
//! Auxiliary sheets are shared by every line sheet of a template and are
//! created once per document, in priority order, ahead of any line sheet
//! command that may reference them.

use crate::config::SyncConfig;
use crate::instantiate::{instantiate, SheetTarget};
use crate::layout::SheetLayout;
use crate::validation::RuleIdGenerator;
use ahash::AHashSet;
use sheetsync_core::{sheet_name_for, Document, MutationCommand, SheetId, SheetOffset, Template};
use sheetsync_formula::MainSheetRename;
use tracing::{info, warn};

/// Auxiliary commands of one pass, kept apart so every sheet exists before
/// any of them is populated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxiliaryBatch {
    pub creates: Vec<MutationCommand>,
    pub populates: Vec<MutationCommand>,
}

impl AuxiliaryBatch {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.populates.is_empty()
    }

    pub fn append(&mut self, mut other: AuxiliaryBatch) {
        self.creates.append(&mut other.creates);
        self.populates.append(&mut other.populates);
    }

    /// Creates first, then populates
    pub fn into_commands(self) -> Vec<MutationCommand> {
        let mut commands = self.creates;
        commands.extend(self.populates);
        commands
    }
}

/// Sheet ids already accounted for in the current pass
#[derive(Debug, Clone, Default)]
pub struct Planned {
    ids: AHashSet<String>,
}

impl Planned {
    pub fn new<I, S>(pending: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: pending.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }
}

/// Commands creating the auxiliary sheets of `template` that the document
/// does not have yet
///
/// Sheets present in `document` or in `planned` are skipped; the ones emitted
/// here are added to `planned`. `main_sheet` tells auxiliary formulas where
/// the template main sheet went.
#[allow(clippy::too_many_arguments)]
pub fn ensure_auxiliaries(
    template: &Template,
    document: &Document,
    planned: &mut Planned,
    layout: &mut SheetLayout,
    main_sheet: Option<&MainSheetRename>,
    config: &SyncConfig,
    ids: &mut dyn RuleIdGenerator,
) -> AuxiliaryBatch {
    let priority = &config.auxiliary_priority;
    let mut sheets: Vec<_> = template.auxiliary_sheets().iter().collect();
    sheets.sort_by_key(|sheet| priority.rank_of(sheet));

    let mut batch = AuxiliaryBatch::default();
    for sheet in sheets {
        if SheetId::from(sheet.id.as_str()).is_line() {
            warn!(sheet = %sheet.id, "auxiliary sheet id collides with line sheet ids, skipping");
            continue;
        }
        if document.contains_sheet(&sheet.id) || planned.contains(&sheet.id) {
            continue;
        }
        planned.insert(&sheet.id);

        let rank = priority.rank_of(sheet);
        let position = layout.insert_auxiliary(&sheet.id, rank);
        let name = sheet_name_for(&sheet.name, &sheet.id);
        info!(sheet = %sheet.id, name = %name, position, "creating auxiliary sheet");

        let target = SheetTarget {
            sheet_id: &sheet.id,
            name: &name,
            offset: SheetOffset::ZERO,
            auxiliary: true,
            position,
            main_sheet,
        };
        let mut commands = instantiate(template, sheet, &target, config, ids);
        let populate = commands.split_off(1);
        batch.creates.extend(commands);
        batch.populates.extend(populate);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::SequentialRuleIds;
    use pretty_assertions::assert_eq;
    use sheetsync_core::{AuxiliaryRole, CellAddress, TemplateSheet};

    fn template() -> Template {
        Template::new(
            "doors",
            vec![
                TemplateSheet::new("main", "Costing").with_cell("A1", "Total"),
                TemplateSheet::new("helper", "Helper").with_cell("A1", "=Costing!B2"),
                TemplateSheet::new("notes", "Notes"),
                TemplateSheet::new("profile", "Profile Master").with_cell("A1", "Code"),
                TemplateSheet::new("summary", "Sheet9").with_role(AuxiliaryRole::Summary),
            ],
        )
    }

    fn created(batch: &AuxiliaryBatch) -> Vec<String> {
        batch
            .creates
            .iter()
            .filter_map(|c| match c {
                MutationCommand::CreateSheet { sheet_id, .. } => Some(sheet_id.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_priority_order_and_creates_first() {
        let doc = Document::new();
        let config = SyncConfig::default();
        let mut layout = SheetLayout::from_document(&doc, &config.auxiliary_priority, []);
        let main = MainSheetRename {
            old_name: "Costing".into(),
            new_name: "Door".into(),
            row_offset: 4,
        };
        let batch = ensure_auxiliaries(
            &template(),
            &doc,
            &mut Planned::default(),
            &mut layout,
            Some(&main),
            &config,
            &mut SequentialRuleIds::new(),
        );

        assert_eq!(created(&batch), vec!["summary", "profile", "helper", "notes"]);
        assert!(batch.populates.iter().all(|c| c.kind() != "CreateSheet"));
        assert!(batch.populates.contains(&MutationCommand::update_cell(
            "helper",
            CellAddress::new(0, 0),
            "=Door!B6"
        )));
        let commands = batch.into_commands();
        assert_eq!(commands[0].kind(), "CreateSheet");
        assert_eq!(commands[3].kind(), "CreateSheet");
        assert_eq!(commands[4].kind(), "UpdateCell");
    }

    #[test]
    fn test_existing_and_planned_skipped() {
        let mut doc = Document::new();
        doc.apply(&[MutationCommand::CreateSheet {
            sheet_id: "helper".into(),
            name: "Helper".into(),
            position: 0,
        }])
        .unwrap();
        let config = SyncConfig::default();
        let mut layout = SheetLayout::from_document(&doc, &config.auxiliary_priority, []);
        let mut planned = Planned::new(["notes"]);

        let batch = ensure_auxiliaries(
            &template(),
            &doc,
            &mut planned,
            &mut layout,
            None,
            &config,
            &mut SequentialRuleIds::new(),
        );
        assert_eq!(created(&batch), vec!["summary", "profile"]);

        let again = ensure_auxiliaries(
            &template(),
            &doc,
            &mut planned,
            &mut layout,
            None,
            &config,
            &mut SequentialRuleIds::new(),
        );
        assert!(again.is_empty());
    }
}
