#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub command: &'static str,
    pub usage: &'static str,
    pub summary: &'static str,
}

pub const SESSION_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "key",
        usage: "/key [API_KEY]",
        summary: "set the OpenAI API key (no argument clears it)",
    },
    CommandSpec {
        command: "upload",
        usage: "/upload PATH",
        summary: "choose the math problem screenshot (jpg, jpeg, png)",
    },
    CommandSpec {
        command: "detail",
        usage: "/detail brief|standard|in-depth",
        summary: "how detailed the explanation should be",
    },
    CommandSpec {
        command: "practice",
        usage: "/practice yes|no",
        summary: "ask for a set of similar problems for practice",
    },
    CommandSpec {
        command: "model",
        usage: "/model NAME",
        summary: "pick the vision model used for solving",
    },
    CommandSpec {
        command: "generate",
        usage: "/generate",
        summary: "solve the uploaded problem",
    },
    CommandSpec {
        command: "show",
        usage: "/show",
        summary: "print the problem and the stored solution",
    },
    CommandSpec {
        command: "download",
        usage: "/download [PATH]",
        summary: "write the solution to math_solution.md",
    },
    CommandSpec {
        command: "status",
        usage: "/status",
        summary: "show the current preferences",
    },
    CommandSpec {
        command: "help",
        usage: "/help",
        summary: "list commands",
    },
    CommandSpec {
        command: "quit",
        usage: "/quit",
        summary: "leave the session",
    },
];

pub fn help_lines() -> Vec<String> {
    let width = SESSION_COMMANDS
        .iter()
        .map(|spec| spec.usage.len())
        .max()
        .unwrap_or(0);
    SESSION_COMMANDS
        .iter()
        .map(|spec| format!("  {:width$}  {}", spec.usage, spec.summary))
        .collect()
}
