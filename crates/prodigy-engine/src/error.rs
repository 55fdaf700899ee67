use thiserror::Error;

/// The model call failed or produced no usable text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ModelInvocationError {
    pub message: String,
}

impl ModelInvocationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("Please provide your OpenAI API key.")]
    MissingCredential,
    #[error("Please upload a math problem screenshot to proceed.")]
    MissingInput,
    #[error("Failed to generate a solution: {0}")]
    ModelInvocation(#[from] ModelInvocationError),
    #[error("Failed to stage the uploaded image: {0}")]
    TransientImage(#[source] std::io::Error),
}

impl SolveError {
    /// Stable snake_case tag for logs and the event file.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::MissingInput => "missing_input",
            Self::ModelInvocation(_) => "model_invocation",
            Self::TransientImage(_) => "transient_image",
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::MissingInput)
    }
}
