use std::fmt;

use indexmap::IndexMap;

pub const DEFAULT_SOLVER_MODEL: &str = "o4-mini";

/// Backend that serves a catalogued model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Dryrun,
}

impl Provider {
    /// Name the engine registers the backend under.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Dryrun => "dryrun",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: String,
    pub provider: Provider,
    /// Only models that accept an image input can solve a screenshot.
    pub reads_images: bool,
}

impl ModelSpec {
    pub fn new(name: &str, provider: Provider, reads_images: bool) -> Self {
        Self {
            name: name.to_string(),
            provider,
            reads_images,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelCatalogue {
    models: IndexMap<String, ModelSpec>,
}

impl Default for ModelCatalogue {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ModelCatalogue {
    pub fn new(models: Option<IndexMap<String, ModelSpec>>) -> Self {
        Self {
            models: models.unwrap_or_else(default_models),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.get(name)
    }

    /// Image-capable models in catalogue order.
    pub fn solvers(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values().filter(|model| model.reads_images)
    }
}

// First image-capable entry is the default solver.
fn default_models() -> IndexMap<String, ModelSpec> {
    [
        ModelSpec::new(DEFAULT_SOLVER_MODEL, Provider::OpenAi, true),
        ModelSpec::new("gpt-4o", Provider::OpenAi, true),
        ModelSpec::new("gpt-4o-mini", Provider::OpenAi, true),
        ModelSpec::new("gpt-4.1-mini", Provider::OpenAi, true),
        ModelSpec::new("dryrun-vision-1", Provider::Dryrun, true),
        ModelSpec::new("dryrun-text-1", Provider::Dryrun, false),
    ]
    .into_iter()
    .map(|spec| (spec.name.clone(), spec))
    .collect()
}
