//! Template lookup by classification

use crate::error::Result;
use indexmap::IndexMap;
use sheetsync_core::{ClassificationId, Template};

/// Anything able to hand out the parsed template of a classification
pub trait TemplateSource: Send + Sync {
    fn template(&self, classification: &str) -> Option<&Template>;
}

/// In-memory templates keyed by classification
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: IndexMap<ClassificationId, Template>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template, returning the one it replaces
    pub fn insert(&mut self, template: Template) -> Option<Template> {
        self.templates
            .insert(template.classification.clone(), template)
    }

    pub fn with(mut self, template: Template) -> Self {
        self.insert(template);
        self
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn classifications(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Parse a JSON array of templates
    pub fn from_json(text: &str) -> Result<Self> {
        let templates: Vec<Template> =
            serde_json::from_str(text).map_err(sheetsync_core::Error::from)?;
        Ok(templates
            .into_iter()
            .fold(Self::new(), |catalog, template| catalog.with(template)))
    }
}

impl TemplateSource for TemplateCatalog {
    fn template(&self, classification: &str) -> Option<&Template> {
        self.templates.get(classification)
    }
}
