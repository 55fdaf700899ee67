use std::fmt;

use thiserror::Error;

use super::catalogue::{ModelCatalogue, ModelSpec};

/// Why the requested model was not the one selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fallback {
    NotRequested,
    Unknown(String),
    NoImageInput(String),
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRequested => f.write_str("No model requested."),
            Self::Unknown(name) => write!(f, "Model '{name}' is not in the catalogue."),
            Self::NoImageInput(name) => write!(f, "Model '{name}' cannot read screenshots."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverSelection {
    pub model: ModelSpec,
    pub fallback: Option<Fallback>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelSelectionError {
    #[error("no model in the catalogue can read screenshots")]
    NoSolverModels,
}

/// Picks the model that will solve screenshots.
///
/// A blank, unknown or text-only request falls back to the first
/// image-capable model and says why.
pub fn resolve_solver(
    catalogue: &ModelCatalogue,
    requested: Option<&str>,
) -> Result<SolverSelection, ModelSelectionError> {
    let fallback = match requested.map(str::trim).filter(|name| !name.is_empty()) {
        None => Fallback::NotRequested,
        Some(name) => match catalogue.get(name) {
            Some(model) if model.reads_images => {
                return Ok(SolverSelection {
                    model: model.clone(),
                    fallback: None,
                });
            }
            Some(_) => Fallback::NoImageInput(name.to_string()),
            None => Fallback::Unknown(name.to_string()),
        },
    };
    let model = catalogue
        .solvers()
        .next()
        .cloned()
        .ok_or(ModelSelectionError::NoSolverModels)?;
    Ok(SolverSelection {
        model,
        fallback: Some(fallback),
    })
}
