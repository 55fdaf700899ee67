use uuid::Uuid;

use crate::upload::UploadedImage;

/// A solution together with the screenshot it was produced from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSolution {
    pub solution: String,
    pub image: UploadedImage,
}

/// Per-session context: the credential and the last successful result.
///
/// The solution and its image live in one `Option`, so a reader sees
/// either both or neither.
#[derive(Debug, Clone)]
pub struct SessionState {
    session_id: String,
    api_key: Option<String>,
    stored: Option<StoredSolution>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::with_id(format!("session-{}", Uuid::new_v4()))
    }

    pub fn with_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            api_key: None,
            stored: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Records a credential. Blank input is ignored and returns `false`.
    pub fn set_api_key(&mut self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }
        self.api_key = Some(trimmed.to_string());
        true
    }

    pub fn clear_api_key(&mut self) {
        self.api_key = None;
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn store_solution(&mut self, solution: String, image: UploadedImage) {
        self.stored = Some(StoredSolution { solution, image });
    }

    pub fn stored(&self) -> Option<&StoredSolution> {
        self.stored.as_ref()
    }

    pub fn solution(&self) -> Option<&str> {
        self.stored.as_ref().map(|stored| stored.solution.as_str())
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        self.stored.as_ref().map(|stored| &stored.image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> UploadedImage {
        UploadedImage::from_bytes(name, vec![7; 4]).unwrap()
    }

    #[test]
    fn new_session_is_empty_with_unique_id() {
        let first = SessionState::new();
        let second = SessionState::new();
        assert!(first.api_key().is_none());
        assert!(first.solution().is_none());
        assert!(first.image().is_none());
        assert!(first.session_id().starts_with("session-"));
        assert_ne!(first.session_id(), second.session_id());
    }

    #[test]
    fn blank_api_key_keeps_previous_value() {
        let mut session = SessionState::with_id("s");
        assert!(!session.set_api_key("   "));
        assert!(session.api_key().is_none());
        assert!(session.set_api_key(" sk-test \n"));
        assert_eq!(session.api_key(), Some("sk-test"));
        assert!(!session.set_api_key(""));
        assert_eq!(session.api_key(), Some("sk-test"));
        session.clear_api_key();
        assert!(session.api_key().is_none());
    }

    #[test]
    fn solution_and_image_are_replaced_together() {
        let mut session = SessionState::with_id("s");
        session.store_solution("first".to_string(), image("a.png"));
        session.store_solution("second".to_string(), image("b.png"));
        assert_eq!(session.solution(), Some("second"));
        assert_eq!(session.image().map(UploadedImage::file_name), Some("b.png"));
    }
}
