//! Projected sheet order
//!
//! Positions in `CreateSheet` commands are computed against the document as
//! it will look when the batch reaches that command: existing sheets, minus
//! sheets deleted earlier in the batch, plus sheets created earlier in it.
//! Line sheets come first, then auxiliary sheets by rank.

use ahash::AHashMap;
use sheetsync_core::{AuxiliaryPriority, Document, SheetId, Template, TemplateSheet};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot {
    id: String,
    /// `None` for line sheets
    rank: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct SheetLayout {
    slots: Vec<Slot>,
}

impl SheetLayout {
    /// Layout of an existing document.
    ///
    /// Auxiliary sheets found in `templates` keep the rank of their template
    /// sheet, explicit role included; others are ranked by name.
    pub fn from_document<'t, I>(
        document: &Document,
        priority: &AuxiliaryPriority,
        templates: I,
    ) -> Self
    where
        I: IntoIterator<Item = &'t Template>,
    {
        let mut known: AHashMap<&str, &TemplateSheet> = AHashMap::new();
        for template in templates {
            for sheet in template.auxiliary_sheets() {
                known.entry(sheet.id.as_str()).or_insert(sheet);
            }
        }

        let slots = document
            .sheets()
            .iter()
            .map(|sheet| Slot {
                id: sheet.id.to_string(),
                rank: if sheet.id.is_line() {
                    None
                } else {
                    Some(match known.get(sheet.id.as_str()) {
                        Some(template_sheet) => priority.rank_of(template_sheet),
                        None => {
                            let probe = TemplateSheet::new(sheet.id.as_str(), sheet.name.as_str());
                            priority.rank_of(&probe)
                        }
                    })
                },
            })
            .collect();
        Self { slots }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.iter().any(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Position for a new line sheet: after the existing line sheets
    pub fn line_position(&self) -> usize {
        self.slots.iter().filter(|s| s.rank.is_none()).count()
    }

    /// Position for a new auxiliary sheet of `rank`: after every sheet of
    /// equal or better rank
    pub fn auxiliary_position(&self, rank: usize) -> usize {
        self.slots
            .iter()
            .filter(|s| s.rank.map_or(true, |r| r <= rank))
            .count()
    }

    /// Record a line sheet insertion, returning its position
    pub fn insert_line(&mut self, id: &SheetId) -> usize {
        let position = self.line_position();
        self.insert_at(position, id.to_string(), None);
        position
    }

    /// Record an auxiliary sheet insertion, returning its position
    pub fn insert_auxiliary(&mut self, id: &str, rank: usize) -> usize {
        let position = self.auxiliary_position(rank);
        self.insert_at(position, id.to_string(), Some(rank));
        position
    }

    pub fn remove(&mut self, id: &str) {
        self.slots.retain(|s| s.id != id);
    }

    fn insert_at(&mut self, position: usize, id: String, rank: Option<usize>) {
        let position = position.min(self.slots.len());
        self.slots.insert(position, Slot { id, rank });
    }
}
