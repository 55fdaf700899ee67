use crate::preferences::parse_practice_choice;
use crate::prompt::ExplanationDetail;

/// One line typed into an interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Noop,
    SetKey(Option<String>),
    Upload(String),
    SetDetail(ExplanationDetail),
    SetPractice(bool),
    SetModel(String),
    Generate,
    Show,
    Download(Option<String>),
    Status,
    Help,
    Quit,
    Invalid { command: String, message: String },
    Unknown { command: String, arg: String },
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> Option<String> {
    let parts = parse_path_args(arg);
    if parts.is_empty() {
        return None;
    }
    Some(parts.join(" "))
}

fn invalid(command: &str, message: impl Into<String>) -> SessionCommand {
    SessionCommand::Invalid {
        command: command.to_string(),
        message: message.into(),
    }
}

pub fn parse_command(text: &str) -> SessionCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return SessionCommand::Noop;
    }

    let Some(slash_tail) = raw_trimmed.strip_prefix('/') else {
        return SessionCommand::Unknown {
            command: String::new(),
            arg: raw_trimmed.to_string(),
        };
    };
    let command_len = slash_tail
        .chars()
        .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .count();
    let command = slash_tail[..command_len].to_ascii_lowercase();
    let arg = slash_tail[command_len..].trim();

    match command.as_str() {
        "key" => SessionCommand::SetKey((!arg.is_empty()).then(|| arg.to_string())),
        "upload" => match parse_single_path_arg(arg) {
            Some(path) => SessionCommand::Upload(path),
            None => invalid("upload", "/upload requires a path"),
        },
        "detail" => match arg.parse::<ExplanationDetail>() {
            Ok(detail) => SessionCommand::SetDetail(detail),
            Err(err) => invalid("detail", err.to_string()),
        },
        "practice" => match parse_practice_choice(arg) {
            Some(choice) => SessionCommand::SetPractice(choice),
            None => invalid("practice", "/practice expects yes or no"),
        },
        "model" if !arg.is_empty() => SessionCommand::SetModel(arg.to_string()),
        "model" => invalid("model", "/model requires a model name"),
        "generate" | "solve" => SessionCommand::Generate,
        "show" => SessionCommand::Show,
        "download" | "export" => SessionCommand::Download(parse_single_path_arg(arg)),
        "status" => SessionCommand::Status,
        "help" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        _ => SessionCommand::Unknown {
            command,
            arg: arg.to_string(),
        },
    }
}
