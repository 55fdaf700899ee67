use crate::prompt::ExplanationDetail;
use crate::upload::UploadedImage;

/// What the user picked for one solve request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolutionPreferences {
    pub uploaded_image: Option<UploadedImage>,
    pub explanation_detail: ExplanationDetail,
    pub practice_requested: bool,
}

impl SolutionPreferences {
    pub fn new(
        uploaded_image: Option<UploadedImage>,
        explanation_detail: ExplanationDetail,
        practice_requested: bool,
    ) -> Self {
        Self {
            uploaded_image,
            explanation_detail,
            practice_requested,
        }
    }

    /// Starting choices of an interactive session: the first option of
    /// each control, a brief overview with practice problems.
    pub fn session_defaults() -> Self {
        Self::new(None, ExplanationDetail::Brief, true)
    }
}

/// Parses the yes/no answer of the practice-set question.
pub fn parse_practice_choice(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "on" | "1" => Some(true),
        "no" | "n" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}
