//! Template instantiation
//!
//! Turns one template sheet into the structural commands that materialize it
//! in a document, and binds line sheets to their record.

use crate::config::SyncConfig;
use crate::layout::SheetLayout;
use crate::validation::{translate, RuleIdGenerator, ValidationTarget};
use sheetsync_core::{
    list_id_for, sheet_name_for, Axis, BackingRecord, CellAddress, CellRange, MutationCommand,
    Sheet, SheetId, SheetOffset, Template, TemplateSheet,
};
use sheetsync_formula::{rewrite, MainSheetRename, RewriteRequest};
use tracing::{debug, warn};

/// Where and how a template sheet is materialized
#[derive(Debug, Clone, Copy)]
pub struct SheetTarget<'a> {
    pub sheet_id: &'a str,
    pub name: &'a str,
    /// Ignored for auxiliary sheets, which always land at A1
    pub offset: SheetOffset,
    pub auxiliary: bool,
    pub position: usize,
    /// Where the template main sheet went; only used for auxiliary sheets
    pub main_sheet: Option<&'a MainSheetRename>,
}

/// Structural commands for one template sheet, in order: create, resize,
/// merge, cells, validation rules. Elements that cannot be read are skipped
/// with a warning.
pub fn instantiate(
    template: &Template,
    sheet: &TemplateSheet,
    target: &SheetTarget<'_>,
    config: &SyncConfig,
    ids: &mut dyn RuleIdGenerator,
) -> Vec<MutationCommand> {
    let offset = if target.auxiliary {
        SheetOffset::ZERO
    } else {
        target.offset
    };
    let main_sheet = target.main_sheet.filter(|_| target.auxiliary);
    let mut names = template.sheet_names();
    names.push(target.name.to_string());
    if let Some(main) = main_sheet {
        names.push(main.new_name.clone());
    }

    let sheet_id = target.sheet_id.to_string();
    let mut commands = vec![MutationCommand::CreateSheet {
        sheet_id: sheet_id.clone(),
        name: target.name.to_string(),
        position: target.position,
    }];

    for (&col, &width) in &sheet.column_sizes {
        commands.push(MutationCommand::ResizeDimension {
            sheet_id: sheet_id.clone(),
            axis: Axis::Col,
            index: u32::from(col) + u32::from(offset.col),
            size: width * config.column_width_scale,
        });
    }
    for (&row, &height) in &sheet.row_sizes {
        commands.push(MutationCommand::ResizeDimension {
            sheet_id: sheet_id.clone(),
            axis: Axis::Row,
            index: row + offset.row,
            size: height,
        });
    }

    for merge in &sheet.merges {
        let range = CellRange::parse(merge)
            .and_then(|r| r.offset(i64::from(offset.row), i64::from(offset.col)));
        match range {
            Ok(range) => commands.push(MutationCommand::AddMerge {
                sheet_id: sheet_id.clone(),
                range,
            }),
            Err(e) => warn!(sheet = %sheet_id, merge = %merge, error = %e, "skipping merge"),
        }
    }

    for (addr, cell) in sheet.cells_by_address() {
        let origin = match addr {
            Ok(addr) => addr,
            Err(key) => {
                warn!(sheet = %sheet_id, cell = %key, "skipping cell with unreadable address");
                continue;
            }
        };
        if cell.content.is_empty() {
            continue;
        }
        let dest = match offset.apply(origin) {
            Ok(dest) => dest,
            Err(e) => {
                warn!(sheet = %sheet_id, cell = %origin, error = %e, "skipping cell outside the grid");
                continue;
            }
        };
        let request = RewriteRequest {
            origin,
            dest,
            origin_sheet: &sheet.name,
            dest_sheet: target.name,
            sheet_names: &names,
            main_sheet,
        };
        match rewrite(&cell.content, &request) {
            Ok(content) => commands.push(MutationCommand::update_cell(sheet_id.clone(), dest, content)),
            Err(e) => warn!(sheet = %sheet_id, cell = %origin, error = %e, "skipping malformed formula"),
        }
    }

    let validation_target = ValidationTarget {
        sheet_id: target.sheet_id,
        origin_sheet: &sheet.name,
        dest_sheet: target.name,
        offset,
        sheet_names: &names,
        main_sheet,
    };
    for validation in &sheet.validations {
        commands.extend(translate(validation, &validation_target, ids));
    }

    debug!(
        sheet = %sheet_id,
        template = %template.classification,
        commands = commands.len(),
        "instantiated template sheet"
    );
    commands
}

/// Header label of a bound column, without any `__<n>` disambiguator
pub fn header_label(column: &str) -> &str {
    column.split("__").next().unwrap_or(column)
}

/// Bind a line sheet to its record: list binding, header row, data row, table
pub fn bind_record(
    sheet_id: &SheetId,
    record: &BackingRecord,
    columns: &[String],
    config: &SyncConfig,
) -> Vec<MutationCommand> {
    let mut commands = vec![MutationCommand::RegisterListBinding {
        list_id: list_id_for(&record.id),
        record_id: record.id.to_string(),
        columns: columns.to_vec(),
        sheet_id: sheet_id.to_string(),
        classification: record.classification.clone(),
    }];

    for (col, column) in columns.iter().enumerate() {
        let Ok(col) = u16::try_from(col) else {
            warn!(sheet = %sheet_id, columns = columns.len(), "too many bound columns");
            break;
        };
        commands.push(MutationCommand::update_cell(
            sheet_id.to_string(),
            CellAddress::new(0, col),
            header_label(column),
        ));
        let value = record.value_of(column);
        if !value.is_empty() {
            commands.push(MutationCommand::update_cell(
                sheet_id.to_string(),
                CellAddress::new(1, col),
                value,
            ));
        }
    }

    if !columns.is_empty() {
        let last = u16::try_from(columns.len() - 1).unwrap_or(u16::MAX);
        commands.push(MutationCommand::CreateTable {
            sheet_id: sheet_id.to_string(),
            range: CellRange::from_indices(0, 0, 1, last),
            style: config.table_style.clone(),
        });
    }
    commands
}

/// `UpdateCell` commands for the data row cells of a bound sheet that no
/// longer show the record's values. Empty when the sheet is current.
pub fn refresh_record(
    sheet: &Sheet,
    record: &BackingRecord,
    columns: &[String],
) -> Vec<MutationCommand> {
    columns
        .iter()
        .enumerate()
        .map_while(|(col, column)| Some((u16::try_from(col).ok()?, column)))
        .filter_map(|(col, column)| {
            let addr = CellAddress::new(1, col);
            let value = record.value_of(column);
            (sheet.cell(addr).unwrap_or_default() != value)
                .then(|| MutationCommand::update_cell(sheet.id.to_string(), addr, value))
        })
        .collect()
}

/// Every command creating the line sheet of `record`
///
/// `template` is `None` when the record's classification has no template;
/// the sheet is then created bare and only bound.
pub fn line_sheet(
    record: &BackingRecord,
    template: Option<&Template>,
    layout: &mut SheetLayout,
    config: &SyncConfig,
    ids: &mut dyn RuleIdGenerator,
) -> Vec<MutationCommand> {
    let sheet_id = SheetId::for_record(&record.id);
    let name = sheet_name_for(&record.display_name, &config.fallback_sheet_name);
    let columns = config.columns.expected_columns(record);
    let position = layout.insert_line(&sheet_id);

    let main = template.and_then(|t| match t.main_sheet() {
        Ok(main) => Some((t, main)),
        Err(e) => {
            warn!(record = %record.id, error = %e, "template has no main sheet");
            None
        }
    });

    let mut commands = match main {
        Some((template, main)) => {
            let target = SheetTarget {
                sheet_id: sheet_id.as_str(),
                name: &name,
                offset: config.line_offset,
                auxiliary: false,
                position,
                main_sheet: None,
            };
            instantiate(template, main, &target, config, ids)
        }
        None => vec![MutationCommand::CreateSheet {
            sheet_id: sheet_id.to_string(),
            name: name.clone(),
            position,
        }],
    };
    commands.extend(bind_record(&sheet_id, record, &columns, config));
    commands
}
