//! Document reconciliation
//!
//! Diffs the line sheets of a document against the records it should show
//! and emits the commands bringing it in line. The batch is ordered so it can
//! be applied in one go: auxiliary sheets (all creates, then all populates),
//! then deletions, then in-place value updates, then line sheet creations.

use crate::auxiliary::{ensure_auxiliaries, AuxiliaryBatch, Planned};
use crate::config::SyncConfig;
use crate::instantiate::{line_sheet, refresh_record};
use crate::layout::SheetLayout;
use crate::source::TemplateSource;
use crate::validation::RuleIdGenerator;
use ahash::AHashSet;
use sheetsync_core::{
    list_id_for, sheet_name_for, BackingRecord, Document, MutationCommand, SheetId, Template,
};
use sheetsync_formula::MainSheetRename;
use tracing::{debug, info, warn};

/// What a record's line sheet needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// No sheet and no binding
    Absent,
    /// Sheet and binding match the record
    Unchanged,
    /// Structure matches but some bound values are out of date
    Stale,
    /// Something exists but is stale or incomplete
    Changed,
}

/// Computes reconciliation batches
pub struct Reconciler<'a, S: TemplateSource + ?Sized> {
    config: &'a SyncConfig,
    templates: &'a S,
}

impl<'a, S: TemplateSource + ?Sized> Reconciler<'a, S> {
    pub fn new(config: &'a SyncConfig, templates: &'a S) -> Self {
        Self { config, templates }
    }

    /// State of one record's line sheet in `document`
    pub fn state_of(&self, document: &Document, record: &BackingRecord) -> RecordState {
        let sheet_id = SheetId::for_record(&record.id);
        let sheet = document.sheet(sheet_id.as_str());
        let binding = document.binding(&list_id_for(&record.id));

        match (sheet, binding) {
            (None, None) => RecordState::Absent,
            (Some(sheet), Some(binding))
                if binding.sheet_id == sheet_id
                    && binding.classification == record.classification
                    && binding.columns == self.config.columns.expected_columns(record)
                    && sheet.name
                        == sheet_name_for(&record.display_name, &self.config.fallback_sheet_name) =>
            {
                if refresh_record(sheet, record, &binding.columns).is_empty() {
                    RecordState::Unchanged
                } else {
                    RecordState::Stale
                }
            }
            _ => RecordState::Changed,
        }
    }

    /// Commands bringing `document` in line with `records`
    ///
    /// `pending` lists sheet ids created by batches not yet visible in the
    /// document; they are neither recreated nor deleted.
    pub fn reconcile(
        &self,
        document: &Document,
        pending: &[String],
        records: &[BackingRecord],
        ids: &mut dyn RuleIdGenerator,
    ) -> Vec<MutationCommand> {
        let templates = records.iter().filter_map(|r| {
            r.classification
                .as_deref()
                .and_then(|c| self.templates.template(c))
        });
        let mut layout =
            SheetLayout::from_document(document, &self.config.auxiliary_priority, templates);
        let mut planned = Planned::new(pending.iter().map(String::as_str));

        let mut seen = AHashSet::new();
        let mut wanted = Vec::new();
        for record in records {
            if !seen.insert(record.id.clone()) {
                warn!(record = %record.id, "duplicate record, ignoring");
                continue;
            }
            let sheet_id = SheetId::for_record(&record.id);
            if planned.contains(sheet_id.as_str()) {
                debug!(record = %record.id, "line sheet pending, skipping");
                continue;
            }
            wanted.push((record, sheet_id, self.state_of(document, record)));
        }

        let mut auxiliaries = AuxiliaryBatch::default();
        for (record, _, _) in &wanted {
            let Some(template) = self.template_for(record) else {
                continue;
            };
            let main_sheet = self.main_sheet_rename(template, record);
            auxiliaries.append(ensure_auxiliaries(
                template,
                document,
                &mut planned,
                &mut layout,
                main_sheet.as_ref(),
                self.config,
                ids,
            ));
        }

        let mut deletions = Vec::new();
        for (record, sheet_id, state) in &wanted {
            if *state == RecordState::Changed {
                info!(record = %record.id, sheet = %sheet_id, "line sheet out of date, recreating");
                self.delete(document, sheet_id, &list_id_for(&record.id), &mut deletions);
                layout.remove(sheet_id.as_str());
            }
        }
        for sheet in document.sheets() {
            let Some(record_id) = sheet.id.record_id() else {
                continue;
            };
            if seen.contains(&record_id) || planned.contains(sheet.id.as_str()) {
                continue;
            }
            info!(sheet = %sheet.id, "record removed, deleting line sheet");
            self.delete(document, &sheet.id, &list_id_for(&record_id), &mut deletions);
            layout.remove(sheet.id.as_str());
        }
        for binding in document.bindings() {
            let owned = seen.contains(&binding.record_id);
            let sheet_gone = !document.contains_sheet(binding.sheet_id.as_str());
            if !owned && sheet_gone && !planned.contains(binding.sheet_id.as_str()) {
                info!(list = %binding.list_id, "dropping orphan list binding");
                deletions.push(MutationCommand::UnregisterListBinding {
                    list_id: binding.list_id.clone(),
                });
            }
        }

        let mut updates = Vec::new();
        for (record, sheet_id, state) in &wanted {
            if *state != RecordState::Stale {
                continue;
            }
            let (Some(sheet), Some(binding)) = (
                document.sheet(sheet_id.as_str()),
                document.binding(&list_id_for(&record.id)),
            ) else {
                continue;
            };
            let refreshed = refresh_record(sheet, record, &binding.columns);
            info!(record = %record.id, sheet = %sheet_id, cells = refreshed.len(), "record values changed, updating line sheet");
            updates.extend(refreshed);
        }

        let mut creations = Vec::new();
        for (record, sheet_id, state) in &wanted {
            if matches!(state, RecordState::Unchanged | RecordState::Stale) {
                continue;
            }
            info!(record = %record.id, sheet = %sheet_id, "creating line sheet");
            creations.extend(line_sheet(
                record,
                self.template_for(record),
                &mut layout,
                self.config,
                ids,
            ));
        }

        debug!(
            auxiliary_sheets = auxiliaries.creates.len(),
            deletions = deletions.len(),
            updates = updates.len(),
            creations = creations.len(),
            "reconciliation planned"
        );

        let mut commands = auxiliaries.into_commands();
        commands.extend(deletions);
        commands.extend(updates);
        commands.extend(creations);
        commands
    }

    fn template_for(&self, record: &BackingRecord) -> Option<&'a Template> {
        let classification = record.classification.as_deref()?;
        let template = self.templates.template(classification);
        if template.is_none() {
            debug!(record = %record.id, classification, "no template for classification");
        }
        template
    }

    fn main_sheet_rename(&self, template: &Template, record: &BackingRecord) -> Option<MainSheetRename> {
        let main = template.main_sheet().ok()?;
        Some(MainSheetRename {
            old_name: main.name.clone(),
            new_name: sheet_name_for(&record.display_name, &self.config.fallback_sheet_name),
            row_offset: i64::from(self.config.line_offset.row),
        })
    }

    /// Delete whichever of the sheet and the binding exist
    fn delete(
        &self,
        document: &Document,
        sheet_id: &SheetId,
        list_id: &str,
        out: &mut Vec<MutationCommand>,
    ) {
        if document.contains_sheet(sheet_id.as_str()) {
            out.push(MutationCommand::DeleteSheet {
                sheet_id: sheet_id.to_string(),
            });
        }
        if document.binding(list_id).is_some() {
            out.push(MutationCommand::UnregisterListBinding {
                list_id: list_id.to_string(),
            });
        }
    }
}
