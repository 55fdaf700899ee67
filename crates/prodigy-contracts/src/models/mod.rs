//! Catalogue of solver models and the rule for picking one.

mod catalogue;
mod selection;

pub use catalogue::{ModelCatalogue, ModelSpec, Provider, DEFAULT_SOLVER_MODEL};
pub use selection::{resolve_solver, Fallback, ModelSelectionError, SolverSelection};
