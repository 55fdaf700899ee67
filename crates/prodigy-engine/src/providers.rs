use std::path::Path;

use prodigy_contracts::models::Provider;
use prodigy_contracts::prompt::SolverPrompt;
use prodigy_contracts::upload::ImageFormat;

use crate::config::SolverConfig;
use crate::error::ModelInvocationError;
use crate::openai::OpenAiVisionModel;

/// Everything one solve call hands to the hosted model.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub prompt: &'a SolverPrompt,
    pub image_path: &'a Path,
    pub image_format: ImageFormat,
}

/// The opaque vision-capable solver. One call, one answer, no retry.
pub trait SolverModel: Send + Sync {
    fn name(&self) -> &str;
    fn solve(&self, request: &ModelRequest<'_>) -> Result<String, ModelInvocationError>;
}

impl<T: SolverModel + ?Sized> SolverModel for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn solve(&self, request: &ModelRequest<'_>) -> Result<String, ModelInvocationError> {
        (**self).solve(request)
    }
}

/// Builds the backend serving `provider`'s catalogued models.
pub fn solver_backend(
    provider: Provider,
    config: &SolverConfig,
) -> anyhow::Result<Box<dyn SolverModel>> {
    Ok(match provider {
        Provider::OpenAi => Box::new(OpenAiVisionModel::new(config)?),
        Provider::Dryrun => Box::new(DryrunModel),
    })
}

/// Offline stand-in for the hosted model.
///
/// Answers with a fixed worked example in bracket-style LaTeX, which
/// exercises the delimiter rewrite downstream.
pub struct DryrunModel;

impl SolverModel for DryrunModel {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn solve(&self, request: &ModelRequest<'_>) -> Result<String, ModelInvocationError> {
        let size = std::fs::metadata(request.image_path)
            .map_err(|err| {
                ModelInvocationError::new(format!(
                    "dryrun could not read {}: {err}",
                    request.image_path.display()
                ))
            })?
            .len();
        let practice = if request.prompt.text.contains(prodigy_contracts::prompt::PRACTICE_PHRASE)
        {
            "\n\n### 📝 Practice Problems\n1. Solve \\(2x + 3 = 7\\).\n2. Solve \\(5x - 1 = 9\\)."
        } else {
            ""
        };
        Ok(format!(
            "### 🧮 Step-by-Step Breakdown\n\
             The screenshot ({size} bytes) shows the equation \\(x + 1 = 2\\).\n\
             Subtract 1 from both sides:\n\
             \\[\nx + 1 - 1 = 2 - 1\n\\]\n\n\
             ### 📘 Solution\n\
             \\[\n\\boxed{{x = 1}}\n\\]\n\n\
             _Generated offline by `{}`._{practice}",
            request.model
        ))
    }
}
