pub mod config;
pub mod error;
pub mod openai;
pub mod providers;
pub mod transient;

use std::path::PathBuf;
use std::time::Instant;

use prodigy_contracts::events::{EventWriter, SessionEvent};
use prodigy_contracts::latex::normalize_math_delimiters;
use prodigy_contracts::preferences::SolutionPreferences;
use prodigy_contracts::prompt::SolverPrompt;
use prodigy_contracts::session::SessionState;
use prodigy_contracts::upload::UploadedImage;

pub use config::SolverConfig;
pub use error::{ModelInvocationError, SolveError};
pub use providers::{solver_backend, DryrunModel, ModelRequest, SolverModel};
pub use transient::TransientImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveState {
    Idle,
    Validating,
    Rejected,
    Requesting,
    Failed,
    Normalizing,
    Stored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveResult {
    pub raw_text: String,
    pub normalized_text: String,
}

/// Runs one solve request: validate, call the model, normalize, store.
///
/// Nothing is written to the session unless every step succeeds.
pub struct SolveOrchestrator<M: SolverModel> {
    model: M,
    model_name: String,
    staging_dir: Option<PathBuf>,
    events: Option<EventWriter>,
    state: SolveState,
}

impl<M: SolverModel> SolveOrchestrator<M> {
    pub fn new(model: M, config: &SolverConfig) -> Self {
        Self {
            model,
            model_name: config.model.clone(),
            staging_dir: config.staging_dir.clone(),
            events: None,
            state: SolveState::Idle,
        }
    }

    pub fn with_events(mut self, events: EventWriter) -> Self {
        self.events = Some(events);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn set_model_name(&mut self, model_name: impl Into<String>) {
        self.model_name = model_name.into();
    }

    /// State reached by the most recent request.
    pub fn state(&self) -> SolveState {
        self.state
    }

    pub fn solve(
        &mut self,
        session: &mut SessionState,
        preferences: &SolutionPreferences,
    ) -> Result<SolveResult, SolveError> {
        self.transition(session, SolveState::Validating);
        let (api_key, image) = match validate(session, preferences) {
            Ok(valid) => valid,
            Err(err) => {
                self.transition(session, SolveState::Rejected);
                tracing::info!(session_id = session.session_id(), reason = err.kind(), "solve rejected");
                self.emit(&SessionEvent::SolveRejected {
                    reason: err.kind().to_string(),
                });
                return Err(err);
            }
        };

        self.transition(session, SolveState::Requesting);
        self.emit(&SessionEvent::SolveRequested {
            detail: preferences.explanation_detail,
            practice: preferences.practice_requested,
            image_digest: image.digest(),
            model: self.model_name.clone(),
        });
        let started = Instant::now();
        let raw_text = match self.request(&api_key, preferences, image) {
            Ok(text) => text,
            Err(err) => {
                self.transition(session, SolveState::Failed);
                tracing::warn!(session_id = session.session_id(), error = %err, "solve failed");
                self.emit(&SessionEvent::SolveFailed {
                    message: err.to_string(),
                });
                return Err(err);
            }
        };

        self.transition(session, SolveState::Normalizing);
        let normalized_text = normalize_math_delimiters(&raw_text);

        session.store_solution(normalized_text.clone(), image.clone());
        self.transition(session, SolveState::Stored);
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            session_id = session.session_id(),
            chars = normalized_text.chars().count(),
            elapsed_ms,
            "solution stored"
        );
        self.emit(&SessionEvent::SolveCompleted {
            chars: normalized_text.chars().count(),
            elapsed_ms,
        });

        Ok(SolveResult {
            raw_text,
            normalized_text,
        })
    }

    fn request(
        &self,
        api_key: &str,
        preferences: &SolutionPreferences,
        image: &UploadedImage,
    ) -> Result<String, SolveError> {
        let transient = TransientImage::persist(image, self.staging_dir.as_deref())
            .map_err(SolveError::TransientImage)?;
        let prompt = SolverPrompt::new(preferences.explanation_detail, preferences.practice_requested);
        tracing::debug!(
            provider = self.model.name(),
            model = %self.model_name,
            image = %image.digest(),
            "calling solver model"
        );
        let text = self.model.solve(&ModelRequest {
            api_key,
            model: &self.model_name,
            prompt: &prompt,
            image_path: transient.path(),
            image_format: image.format(),
        })?;
        if text.trim().is_empty() {
            return Err(ModelInvocationError::new("model returned no text").into());
        }
        Ok(text)
    }

    fn transition(&mut self, session: &SessionState, next: SolveState) {
        tracing::debug!(
            session_id = session.session_id(),
            from = ?self.state,
            to = ?next,
            "solve state"
        );
        self.state = next;
    }

    fn emit(&self, event: &SessionEvent) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.emit(event) {
            tracing::warn!(path = %events.path().display(), "failed to append session event: {err:#}");
        }
    }
}

// Credential first, then image.
fn validate<'a>(
    session: &SessionState,
    preferences: &'a SolutionPreferences,
) -> Result<(String, &'a UploadedImage), SolveError> {
    let api_key = session
        .api_key()
        .filter(|key| !key.trim().is_empty())
        .ok_or(SolveError::MissingCredential)?
        .to_string();
    let image = preferences
        .uploaded_image
        .as_ref()
        .ok_or(SolveError::MissingInput)?;
    Ok((api_key, image))
}
