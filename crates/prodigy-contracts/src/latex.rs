//! Conversion of bracket-style LaTeX math delimiters into the dollar
//! delimiters Markdown renderers understand.
//!
//! - `\[ .. \]` becomes `$$ .. $$` and may span lines
//! - `\( .. \)` becomes `$ .. $` and stays on one line
//!
//! Both rewrites are non-greedy and leave the enclosed text untouched.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn block_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)\\\[(.*?)\\\]").expect("block math pattern"))
}

fn inline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\\\((.*?)\\\)").expect("inline math pattern"))
}

pub fn normalize_math_delimiters(text: &str) -> String {
    let blocks = block_pattern().replace_all(text, |caps: &Captures| format!("$${}$$", &caps[1]));
    inline_pattern()
        .replace_all(&blocks, |caps: &Captures| format!("${}$", &caps[1]))
        .into_owned()
}
