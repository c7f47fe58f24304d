//! Validation rule translation
//!
//! Converts a template dropdown rule into one `AddValidationRule` command per
//! destination cell.

use ahash::AHashSet;
use rand::Rng;
use sheetsync_core::{
    CellRange, Criterion, MutationCommand, SheetOffset, ValidationSource, WorkbookValidation,
};
use sheetsync_formula::{parse_reference, MainSheetRename, SheetQualifier};
use tracing::warn;

/// Source of rule ids
pub trait RuleIdGenerator: Send {
    /// A fresh id, never returned before by this generator
    fn next_id(&mut self) -> String;
}

/// `dv_<8 hex>` ids drawn from the thread RNG
#[derive(Debug, Default)]
pub struct RandomRuleIds {
    issued: AHashSet<String>,
}

impl RandomRuleIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleIdGenerator for RandomRuleIds {
    fn next_id(&mut self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let id = format!("dv_{:08x}", rng.gen::<u32>());
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }
}

/// `dv_00000001`, `dv_00000002`, ... for reproducible output
#[derive(Debug, Default)]
pub struct SequentialRuleIds {
    next: u32,
}

impl SequentialRuleIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RuleIdGenerator for SequentialRuleIds {
    fn next_id(&mut self) -> String {
        self.next += 1;
        format!("dv_{:08x}", self.next)
    }
}

/// Where a template sheet's validations are being written
#[derive(Debug, Clone, Copy)]
pub struct ValidationTarget<'a> {
    pub sheet_id: &'a str,
    /// Template name of the sheet being instantiated
    pub origin_sheet: &'a str,
    /// Name it has in the document
    pub dest_sheet: &'a str,
    pub offset: SheetOffset,
    pub sheet_names: &'a [String],
    /// Set when instantiating an auxiliary sheet
    pub main_sheet: Option<&'a MainSheetRename>,
}

/// Expand one workbook validation into per-cell rules
pub fn translate(
    validation: &WorkbookValidation,
    target: &ValidationTarget<'_>,
    ids: &mut dyn RuleIdGenerator,
) -> Vec<MutationCommand> {
    let Some(criterion) = criterion_for(&validation.source, target) else {
        return Vec::new();
    };

    let mut commands = Vec::new();
    for range in &validation.ranges {
        let dest = CellRange::parse(range)
            .and_then(|r| r.offset(i64::from(target.offset.row), i64::from(target.offset.col)));
        let dest = match dest {
            Ok(dest) => dest,
            Err(e) => {
                warn!(sheet = target.sheet_id, range = %range, error = %e, "skipping validation range");
                continue;
            }
        };
        for cell in dest.cells() {
            commands.push(MutationCommand::AddValidationRule {
                sheet_id: target.sheet_id.to_string(),
                rule_id: ids.next_id(),
                target_cell: cell.to_a1_string(),
                criterion: criterion.clone(),
            });
        }
    }
    commands
}

fn criterion_for(source: &ValidationSource, target: &ValidationTarget<'_>) -> Option<Criterion> {
    let text = match source {
        ValidationSource::Literal(values) => return Some(Criterion::ValueInSet(values.clone())),
        ValidationSource::Range(text) => text,
    };

    let reference = match parse_reference(text.trim_start_matches('='), target.sheet_names) {
        Ok(reference) => reference,
        Err(e) => {
            warn!(sheet = target.sheet_id, source = %text, error = %e, "skipping validation with unreadable source");
            return None;
        }
    };

    let own_sheet = reference
        .sheet
        .as_ref()
        .map_or(true, |q| q.is(target.origin_sheet));
    let main = target.main_sheet.filter(|main| {
        reference
            .sheet
            .as_ref()
            .is_some_and(|q| q.is(&main.old_name))
    });

    let moved = if own_sheet {
        reference
            .shifted_rows(i64::from(target.offset.row))
            .map(|mut r| {
                r.sheet = Some(SheetQualifier::new(target.dest_sheet, true));
                r
            })
    } else if let Some(main) = main {
        reference.shifted_rows(main.row_offset).map(|mut r| {
            r.sheet = Some(SheetQualifier::new(main.new_name.as_str(), true));
            r
        })
    } else {
        Ok(reference)
    };

    match moved {
        Ok(reference) => Some(Criterion::ValueInRange(reference.to_quoted_string())),
        Err(e) => {
            warn!(sheet = target.sheet_id, source = %text, error = %e, "validation source leaves the grid");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names() -> Vec<String> {
        vec!["Costing".into(), "Profile Master".into(), "Resin".into()]
    }

    fn line_target(names: &[String]) -> ValidationTarget<'_> {
        ValidationTarget {
            sheet_id: "sheet_9",
            origin_sheet: "Costing",
            dest_sheet: "Casement Window",
            offset: SheetOffset::new(4, 0),
            sheet_names: names,
            main_sheet: None,
        }
    }

    fn rules(commands: &[MutationCommand]) -> Vec<(String, Criterion)> {
        commands
            .iter()
            .filter_map(|c| match c {
                MutationCommand::AddValidationRule {
                    target_cell,
                    criterion,
                    ..
                } => Some((target_cell.clone(), criterion.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_literal_expands_per_cell() {
        let names = names();
        let validation = WorkbookValidation::literal(["Yes", "No"])
            .with_range("A2:A3");
        let commands = translate(&validation, &line_target(&names), &mut SequentialRuleIds::new());

        let set = Criterion::ValueInSet(vec!["Yes".into(), "No".into()]);
        assert_eq!(
            rules(&commands),
            vec![("A6".to_string(), set.clone()), ("A7".to_string(), set)]
        );
    }

    #[test]
    fn test_rule_ids_unique() {
        let names = names();
        let validation = WorkbookValidation::literal(["x"])
            .with_range("A1:C3");
        let mut ids = RandomRuleIds::new();
        let mut seen = AHashSet::new();
        for _ in 0..3 {
            for command in translate(&validation, &line_target(&names), &mut ids) {
                if let MutationCommand::AddValidationRule { rule_id, .. } = command {
                    assert!(rule_id.starts_with("dv_") && rule_id.len() == 11);
                    assert!(seen.insert(rule_id));
                }
            }
        }
        assert_eq!(seen.len(), 27);
    }

    #[test]
    fn test_range_to_auxiliary_keeps_rows() {
        let names = names();
        let validation = WorkbookValidation::from_formula(&["B2"], "='Profile Master'!$A$2:$A$50");
        let commands = translate(&validation, &line_target(&names), &mut SequentialRuleIds::new());
        assert_eq!(
            rules(&commands),
            vec![(
                "B6".to_string(),
                Criterion::ValueInRange("'Profile Master'!$A$2:$A$50".into())
            )]
        );
    }

    #[test]
    fn test_range_to_own_sheet_moves_and_renames() {
        let names = names();
        for source in ["=Costing!$D$2:$D$9", "=$D$2:$D$9"] {
            let validation = WorkbookValidation::from_formula(&["C2"], source);
            let commands =
                translate(&validation, &line_target(&names), &mut SequentialRuleIds::new());
            assert_eq!(
                rules(&commands),
                vec![(
                    "C6".to_string(),
                    Criterion::ValueInRange("'Casement Window'!$D$6:$D$13".into())
                )]
            );
        }
    }

    #[test]
    fn test_bare_sheet_range_is_quoted() {
        let names = names();
        let validation = WorkbookValidation::from_formula(&["A1"], "Resin!A2:A20");
        let commands = translate(&validation, &line_target(&names), &mut SequentialRuleIds::new());
        assert_eq!(
            rules(&commands)[0].1,
            Criterion::ValueInRange("'Resin'!A2:A20".into())
        );
    }

    #[test]
    fn test_auxiliary_follows_main_sheet() {
        let names = names();
        let main = MainSheetRename {
            old_name: "Costing".into(),
            new_name: "Door".into(),
            row_offset: 4,
        };
        let target = ValidationTarget {
            sheet_id: "helper",
            origin_sheet: "Helper",
            dest_sheet: "Helper",
            offset: SheetOffset::ZERO,
            sheet_names: &names,
            main_sheet: Some(&main),
        };
        let validation = WorkbookValidation::from_formula(&["A2"], "=Costing!A1:A3");
        let commands = translate(&validation, &target, &mut SequentialRuleIds::new());
        assert_eq!(
            rules(&commands),
            vec![("A2".to_string(), Criterion::ValueInRange("'Door'!A5:A7".into()))]
        );
    }

    #[test]
    fn test_unreadable_source_skipped() {
        let names = names();
        let validation = WorkbookValidation::range_reference("=SUM(")
            .with_range("A1");
        assert!(translate(&validation, &line_target(&names), &mut SequentialRuleIds::new()).is_empty());
    }

    #[test]
    fn test_unreadable_range_skipped() {
        let names = names();
        let validation = WorkbookValidation::literal(["Yes"])
            .with_range("A0")
            .with_range("nonsense")
            .with_range("B2");
        let commands = translate(&validation, &line_target(&names), &mut SequentialRuleIds::new());
        assert_eq!(
            rules(&commands),
            vec![("B6".to_string(), Criterion::ValueInSet(vec!["Yes".into()]))]
        );
    }
}
