//! End-to-end behavior of reconciliation and dispatch

use pretty_assertions::assert_eq;
use sheetsync::prelude::*;
use sheetsync::{
    AuxiliaryRole, CellAddress, Criterion, RecordingSleeper, SequentialRuleIds, SheetKind,
};
use std::sync::Arc;
use std::time::Duration;

fn window_template() -> Template {
    Template::new(
        "windows",
        vec![
            TemplateSheet::new("main", "Costing")
                .with_cell("A1", "Width")
                .with_cell("B1", "=A1+B2")
                .with_cell("C1", "='Profile Master'!A1 + B3")
                .with_cell("D1", "=$B$3")
                .with_merge("A3:B3")
                .with_validation(
                    WorkbookValidation::literal(["Yes", "No"])
                        .with_range("A2:A3"),
                )
                .with_validation(
                    WorkbookValidation::from_formula(&["C2"], "='Profile Master'!$A$2:$A$9"),
                ),
            // deliberately out of priority order
            TemplateSheet::new("helper", "Helper").with_cell("A1", "=Costing!B2"),
            TemplateSheet::new("resin", "Resin").with_cell("A1", "Grade"),
            TemplateSheet::new("profile_master", "Profile Master").with_cell("A1", "Code"),
            TemplateSheet::new("totals", "Totals").with_role(AuxiliaryRole::Summary),
        ],
    )
}

fn window(id: u64) -> BackingRecord {
    BackingRecord::new(id)
        .with_classification("windows")
        .with_name(format!("Window {id}"))
        .with_field("product_template_id", "Casement")
        .with_field("quantity", 2.0)
        .with_attribute("Color", "White")
}

fn catalog() -> TemplateCatalog {
    TemplateCatalog::new().with(window_template())
}

fn plan(document: &Document, records: &[BackingRecord]) -> Vec<MutationCommand> {
    let config = SyncConfig::default();
    let catalog = catalog();
    Reconciler::new(&config, &catalog).reconcile(
        document,
        &[],
        records,
        &mut SequentialRuleIds::new(),
    )
}

fn applied(records: &[BackingRecord]) -> Document {
    let mut document = Document::new();
    document.apply(&plan(&document, records)).unwrap();
    document
}

fn is_line_command(command: &MutationCommand) -> bool {
    match command {
        MutationCommand::UnregisterListBinding { .. } => true,
        other => other.sheet_id().is_some_and(|id| id.starts_with("sheet_")),
    }
}

#[test]
fn test_reconcile_is_idempotent() {
    let records = vec![window(1), window(2)];
    let document = applied(&records);
    assert!(plan(&document, &records).is_empty());
}

#[test]
fn test_sheet_identity_is_deterministic() {
    let a = plan(&Document::new(), &[window(42)]);
    let b = plan(&Document::new(), &[window(42)]);
    assert_eq!(a, b);
    assert!(a.contains(&MutationCommand::CreateSheet {
        sheet_id: "sheet_42".into(),
        name: "Window 42".into(),
        position: 0,
    }));
}

#[test]
fn test_auxiliary_commands_precede_line_commands() {
    let commands = plan(&Document::new(), &[window(1), window(2)]);
    let last_auxiliary = commands
        .iter()
        .rposition(|c| !is_line_command(c))
        .unwrap();
    let first_line = commands.iter().position(is_line_command).unwrap();
    assert!(last_auxiliary < first_line);

    let auxiliary_creates: Vec<&str> = commands
        .iter()
        .filter_map(|c| match c {
            MutationCommand::CreateSheet { sheet_id, .. } if !sheet_id.starts_with("sheet_") => {
                Some(sheet_id.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        auxiliary_creates,
        vec!["totals", "profile_master", "resin", "helper"]
    );
}

#[test]
fn test_document_layout() {
    let document = applied(&[window(1), window(2)]);
    assert_eq!(
        document.sheet_names(),
        vec!["Window 1", "Window 2", "Totals", "Profile Master", "Resin", "Helper"]
    );
    assert_eq!(document.sheet("resin").map(|s| s.kind), Some(SheetKind::Auxiliary));
    assert_eq!(document.active_sheet().map(|s| s.as_str()), Some("sheet_1"));
}

#[test]
fn test_formulas_relocated_into_line_sheet() {
    let document = applied(&[window(1)]);
    let sheet = document.sheet("sheet_1").unwrap();

    assert_eq!(sheet.cell_a1("A5").unwrap(), Some("Width"));
    assert_eq!(sheet.cell_a1("B5").unwrap(), Some("=A5+B6"));
    assert_eq!(sheet.cell_a1("C5").unwrap(), Some("='Profile Master'!A1 + B7"));
    assert_eq!(sheet.cell_a1("D5").unwrap(), Some("=$B$7"));
    assert_eq!(sheet.merges(), &[CellRange::parse("A7:B7").unwrap()]);

    let helper = document.sheet("helper").unwrap();
    assert_eq!(helper.cell(CellAddress::new(0, 0)), Some("='Window 1'!B6"));
}

#[test]
fn test_bound_list_rows() {
    let document = applied(&[window(1)]);
    let sheet = document.sheet("sheet_1").unwrap();
    assert_eq!(sheet.cell_a1("A1").unwrap(), Some("product_template_id"));
    assert_eq!(sheet.cell_a1("C1").unwrap(), Some("Color"));
    assert_eq!(sheet.cell_a1("B2").unwrap(), Some("2"));
    assert_eq!(sheet.cell_a1("C2").unwrap(), Some("White"));
    assert_eq!(sheet.tables()[0].range, CellRange::parse("A1:C2").unwrap());

    let binding = document.binding("1").unwrap();
    assert_eq!(binding.sheet_id.as_str(), "sheet_1");
    assert_eq!(binding.columns, vec!["product_template_id", "quantity", "Color"]);
}

#[test]
fn test_validation_expansion() {
    let document = applied(&[window(1)]);
    let rules = document.sheet("sheet_1").unwrap().rules();

    let literal: Vec<&str> = rules
        .iter()
        .filter(|r| r.criterion == Criterion::ValueInSet(vec!["Yes".into(), "No".into()]))
        .map(|r| r.target_cell.as_str())
        .collect();
    assert_eq!(literal, vec!["A6", "A7"]);

    let ranged: Vec<_> = rules
        .iter()
        .filter(|r| matches!(r.criterion, Criterion::ValueInRange(_)))
        .collect();
    assert_eq!(ranged.len(), 1);
    assert_eq!(ranged[0].target_cell, "C6");
    assert_eq!(
        ranged[0].criterion,
        Criterion::ValueInRange("'Profile Master'!$A$2:$A$9".into())
    );
}

#[test]
fn test_removed_record_deletes_only_its_sheet() {
    let document = applied(&[window(1), window(2)]);
    let commands = plan(&document, &[window(1)]);
    assert_eq!(
        commands,
        vec![
            MutationCommand::DeleteSheet {
                sheet_id: "sheet_2".into()
            },
            MutationCommand::UnregisterListBinding {
                list_id: "2".into()
            },
        ]
    );
}

#[test]
fn test_classification_change_recreates() {
    let mut document = applied(&[window(1)]);
    let moved = BackingRecord {
        classification: Some("doors".into()),
        ..window(1)
    };
    let commands = plan(&document, &[moved.clone()]);
    assert_eq!(commands[0].kind(), "DeleteSheet");
    assert_eq!(commands[1].kind(), "UnregisterListBinding");

    document.apply(&commands).unwrap();
    assert_eq!(
        document.binding("1").and_then(|b| b.classification.as_deref()),
        Some("doors")
    );
    assert!(plan(&document, &[moved]).is_empty());
}

#[test]
fn test_persistent_conflict_is_deferred() {
    let session = Arc::new(InMemorySession::new());
    let sleeper = Arc::new(RecordingSleeper::new());
    let sync = Synchronizer::new(SyncConfig::default(), Arc::new(catalog()), session.clone())
        .with_sleeper(sleeper.clone());
    let records = vec![window(1)];

    session.inject_conflicts(u32::MAX);
    let outcome = sync.handle(&SyncTrigger::RecordCreated(records[0].id.clone()), &records);
    match outcome {
        SyncOutcome::Deferred { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected deferral, got {other:?}"),
    }
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
    assert!(!session.document().contains_sheet("sheet_1"));

    // the next trigger catches up
    session.inject_conflicts(0);
    let outcome = sync.handle(&SyncTrigger::SessionJoined, &records);
    assert!(matches!(outcome, SyncOutcome::Applied { attempts: 1, .. }));
    assert!(session.document().contains_sheet("sheet_1"));
}

#[test]
fn test_pending_sheets_are_not_duplicated() {
    let session = Arc::new(InMemorySession::new());
    let sync = Synchronizer::new(SyncConfig::default(), Arc::new(catalog()), session.clone());
    session.set_pending(["sheet_1", "totals", "profile_master", "resin", "helper"]);

    assert_eq!(sync.handle(&SyncTrigger::Manual, &[window(1)]), SyncOutcome::UpToDate);
    assert_eq!(session.batches(), 0);
}
