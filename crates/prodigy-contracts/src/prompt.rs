use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How much reasoning the tutor should show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExplanationDetail {
    Brief,
    #[default]
    Standard,
    InDepth,
}

impl ExplanationDetail {
    pub const ALL: [ExplanationDetail; 3] = [Self::Brief, Self::Standard, Self::InDepth];

    pub fn label(self) -> &'static str {
        match self {
            Self::Brief => "Brief overview",
            Self::Standard => "Standard step-by-step",
            Self::InDepth => "In-depth explanation with reasoning",
        }
    }

    /// Short name accepted by `--detail` and `/detail`.
    pub fn token(self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Standard => "standard",
            Self::InDepth => "in-depth",
        }
    }
}

impl fmt::Display for ExplanationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown explanation detail '{0}' (expected brief, standard or in-depth)")]
pub struct ParseDetailError(pub String);

impl FromStr for ExplanationDetail {
    type Err = ParseDetailError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        if normalized == "indepth" {
            return Ok(Self::InDepth);
        }
        Self::ALL
            .into_iter()
            .find(|detail| {
                detail.token() == normalized || detail.label().to_ascii_lowercase() == normalized
            })
            .ok_or_else(|| ParseDetailError(raw.trim().to_string()))
    }
}

pub const PRACTICE_PHRASE: &str = "a set of similar problems for practice";
pub const SOLUTION_ONLY_PHRASE: &str = "only the solution";

/// The two text parts sent with every solve request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverPrompt {
    pub instructions: String,
    pub text: String,
}

impl SolverPrompt {
    pub fn new(detail: ExplanationDetail, practice_requested: bool) -> Self {
        Self {
            instructions: solver_instructions(),
            text: build_prompt(detail, practice_requested),
        }
    }
}

pub fn build_prompt(detail: ExplanationDetail, practice_requested: bool) -> String {
    let requested = if practice_requested {
        PRACTICE_PHRASE
    } else {
        SOLUTION_ONLY_PHRASE
    };
    format!(
        "A user has uploaded a screenshot of a math problem.\n\n\
         Please solve it and provide a **{}** explanation, as per the defined explanation styles.\n\n\
         The user has requested **{requested}**.\n\n\
         Structure your response clearly and format all math using Markdown and LaTeX.",
        detail.label().to_lowercase(),
    )
}

const ROLE: &str = "A math tutor that solves problems from screenshots and provides explanations \
in varying depth based on the user's preference.";

const DESCRIPTION: &str = "You are a helpful and accurate math tutor. Your task is to interpret \
the math problem shown in the uploaded image, solve it step-by-step, and explain it according to \
the chosen explanation detail. If requested, provide similar practice problems as well.";

const RESPONSE_LAYOUT: &str = "Follow this structured response format:\n\n\
### 🧮 Step-by-Step Breakdown\n\
<Break the problem down progressively>\n\n\
### 📘 Solution\n\
<Conclude with reasoning and final boxed answer>\n\n\
### 📝 Practice Problems (if requested)\n\
<Include 2–3 related problems with or without solutions>";

pub fn solver_instructions() -> String {
    let mut rules = vec![
        "Carefully read and understand the math problem from the uploaded image.".to_string(),
        "Solve the problem methodically, building up to the final answer without revealing it at the beginning.".to_string(),
        "Adapt the explanation style based on the user's selected preference:".to_string(),
    ];
    for detail in ExplanationDetail::ALL {
        let style = match detail {
            ExplanationDetail::Brief => "Focus on key steps only, no detailed reasoning.",
            ExplanationDetail::Standard => "Show all steps clearly with brief justifications.",
            ExplanationDetail::InDepth => {
                "Include detailed reasoning and concept-level insights for each step."
            }
        };
        rules.push(format!("- For **{}**: {style}", detail.label()));
    }
    rules.push(
        "If the user requested additional practice, include 2–3 similar math problems at the end."
            .to_string(),
    );
    rules.push(RESPONSE_LAYOUT.to_string());
    rules.push(
        "Only use what is visible in the image. Avoid assuming or fabricating any information."
            .to_string(),
    );
    rules.push("Format all math expressions clearly using Markdown and LaTeX.".to_string());

    format!(
        "Role: {ROLE}\n\n{DESCRIPTION}\n\nInstructions:\n{}",
        rules.join("\n")
    )
}
