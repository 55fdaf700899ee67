use std::fs;
use std::io::{self, BufRead, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use prodigy_contracts::chat::{help_lines, parse_command, SessionCommand};
use prodigy_contracts::events::{EventWriter, SessionEvent};
use prodigy_contracts::export::{export_solution, SOLUTION_FILE_NAME, SOLUTION_MIME};
use prodigy_contracts::latex::normalize_math_delimiters;
use prodigy_contracts::models::{resolve_solver, ModelCatalogue};
use prodigy_contracts::preferences::SolutionPreferences;
use prodigy_contracts::prompt::ExplanationDetail;
use prodigy_contracts::session::SessionState;
use prodigy_contracts::upload::UploadedImage;
use prodigy_engine::config::api_key_from_env;
use prodigy_engine::{solver_backend, SolveOrchestrator, SolverConfig, SolverModel};

mod logging;

const DRYRUN_MODEL: &str = "dryrun-vision-1";

const DISCLAIMER: &str = "⚠️ **Disclaimer:** This bot may occasionally misinterpret or \
inaccurately solve certain math problems. Please review outputs before relying on them.";

#[derive(Debug, Parser)]
#[command(
    name = "math-prodigy",
    version,
    about = "Step-by-step solutions for screenshots of math problems"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Solve one screenshot and print the solution.
    Solve(SolveArgs),
    /// Interactive session: upload, generate, show, download.
    Session(SessionArgs),
    /// Rewrite \( \) and \[ \] math delimiters to $ and $$.
    Normalize(NormalizeArgs),
}

#[derive(Debug, Args)]
struct BackendArgs {
    /// Vision model used for solving (defaults to PRODIGY_MODEL or o4-mini).
    #[arg(long)]
    model: Option<String>,
    /// Answer offline with the dry-run backend.
    #[arg(long, conflicts_with = "model")]
    dry_run: bool,
    /// OpenAI API key (defaults to OPENAI_API_KEY).
    #[arg(long)]
    api_key: Option<String>,
    /// Append session events to this JSONL file.
    #[arg(long)]
    events: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct SolveArgs {
    /// Screenshot of the problem (jpg, jpeg or png).
    #[arg(long)]
    image: PathBuf,
    /// brief, standard or in-depth.
    #[arg(long, default_value = "standard")]
    detail: ExplanationDetail,
    /// Also ask for a set of similar problems for practice.
    #[arg(long)]
    practice: bool,
    /// Save the solution as Markdown (a directory gets math_solution.md).
    #[arg(long)]
    out: Option<PathBuf>,
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Debug, Args)]
struct SessionArgs {
    #[command(flatten)]
    backend: BackendArgs,
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    /// Read from this file instead of stdin.
    #[arg(long)]
    input: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);
    match run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("math-prodigy error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Solve(args) => run_solve(args),
        Command::Session(args) => run_session(args),
        Command::Normalize(args) => run_normalize(args),
    }
}

/// Builds solve orchestrators for one session and owns its event log.
struct Backend {
    config: SolverConfig,
    events: Option<EventWriter>,
}

impl Backend {
    fn new(args: &BackendArgs, session: &SessionState) -> Self {
        let mut config = SolverConfig::from_env();
        if args.dry_run {
            config.model = DRYRUN_MODEL.to_string();
        } else if let Some(model) = args.model.as_deref() {
            config.model = model.to_string();
        }
        let events = args
            .events
            .as_ref()
            .map(|path| EventWriter::new(path, session.session_id()));
        Self { config, events }
    }

    /// Resolves `requested` against the catalogue and builds its backend.
    /// A fallback is reported on `notes`.
    fn orchestrator(
        &self,
        requested: &str,
        notes: &mut impl Write,
    ) -> Result<SolveOrchestrator<Box<dyn SolverModel>>> {
        let selection = resolve_solver(&ModelCatalogue::default(), Some(requested))?;
        let spec = selection.model;
        if let Some(fallback) = selection.fallback {
            writeln!(notes, "note: {fallback} Using '{}'.", spec.name)?;
        }
        let mut config = self.config.clone();
        config.model = spec.name.clone();
        let model = solver_backend(spec.provider, &config)?;
        tracing::debug!(provider = %spec.provider, model = %spec.name, "solver backend ready");
        let orchestrator = SolveOrchestrator::new(model, &config);
        Ok(match self.events.clone() {
            Some(events) => orchestrator.with_events(events),
            None => orchestrator,
        })
    }

    fn start(&self, notes: &mut impl Write) -> Result<SolveOrchestrator<Box<dyn SolverModel>>> {
        let orchestrator = self.orchestrator(&self.config.model, notes)?;
        self.emit(SessionEvent::SessionStarted {
            provider: orchestrator.model().name().to_string(),
            model: orchestrator.model_name().to_string(),
        });
        Ok(orchestrator)
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = self.events.as_ref() {
            if let Err(err) = events.emit(&event) {
                tracing::warn!("failed to append session event: {err:#}");
            }
        }
    }
}

fn start_session(args: &BackendArgs) -> (SessionState, Backend) {
    let mut session = SessionState::new();
    if let Some(key) = args.api_key.clone().or_else(api_key_from_env) {
        session.set_api_key(&key);
    }
    let backend = Backend::new(args, &session);
    (session, backend)
}

fn run_solve(args: SolveArgs) -> Result<i32> {
    let (mut session, backend) = start_session(&args.backend);
    let mut orchestrator = backend.start(&mut io::stderr())?;

    let uploaded = UploadedImage::from_path(&args.image)?;
    let preferences = SolutionPreferences::new(Some(uploaded), args.detail, args.practice);
    eprintln!("Solving your math problem...");
    if let Err(err) = orchestrator.solve(&mut session, &preferences) {
        eprintln!("{err}");
        return Ok(1);
    }
    print!("{}", render_result(&session));

    if let Some(out) = args.out.as_deref() {
        let path = export_solution(&session, out)?;
        backend.emit(SessionEvent::SolutionExported {
            path: path.display().to_string(),
        });
        println!("📥 Saved solution to {} ({SOLUTION_MIME})", path.display());
    }
    Ok(0)
}

fn run_session(args: SessionArgs) -> Result<i32> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut repl = SessionRepl::start(&args.backend, PathBuf::from("."), &mut out)?;
    repl.run(io::stdin().lock(), &mut out)?;
    Ok(0)
}

/// The interactive page: one session, its current choices and the active
/// model. Commands run to completion before the next line is read.
struct SessionRepl {
    session: SessionState,
    backend: Backend,
    orchestrator: SolveOrchestrator<Box<dyn SolverModel>>,
    preferences: SolutionPreferences,
    download_dir: PathBuf,
}

impl SessionRepl {
    fn start(args: &BackendArgs, download_dir: PathBuf, out: &mut impl Write) -> Result<Self> {
        let (session, backend) = start_session(args);
        let orchestrator = backend.start(out)?;
        writeln!(out, "🧮 Math Prodigy session started. Type /help for commands.")?;
        if session.api_key().is_none() {
            writeln!(out, "No API key found; set one with /key.")?;
        }
        Ok(Self {
            session,
            backend,
            orchestrator,
            preferences: SolutionPreferences::session_defaults(),
            download_dir,
        })
    }

    fn run(&mut self, mut input: impl BufRead, out: &mut impl Write) -> Result<()> {
        let mut line = String::new();
        loop {
            write!(out, "> ")?;
            out.flush()?;

            line.clear();
            match input.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
            if !self.dispatch(parse_command(line.trim_end_matches(['\n', '\r'])), out)? {
                break;
            }
        }
        Ok(())
    }

    /// Runs one command; `false` ends the session.
    fn dispatch(&mut self, command: SessionCommand, out: &mut impl Write) -> Result<bool> {
        match command {
            SessionCommand::Noop => {}
            SessionCommand::SetKey(Some(key)) => {
                if self.session.set_api_key(&key) {
                    writeln!(out, "✅ OpenAI API key updated!")?;
                }
            }
            SessionCommand::SetKey(None) => {
                self.session.clear_api_key();
                writeln!(out, "API key cleared.")?;
            }
            SessionCommand::Upload(path) => match UploadedImage::from_path(Path::new(&path)) {
                Ok(image) => {
                    writeln!(out, "Uploaded {} ({} bytes)", image.file_name(), image.len())?;
                    self.preferences.uploaded_image = Some(image);
                }
                Err(err) => writeln!(out, "Upload failed: {err}")?,
            },
            SessionCommand::SetDetail(detail) => {
                self.preferences.explanation_detail = detail;
                writeln!(out, "Explanation detail: {detail}")?;
            }
            SessionCommand::SetPractice(practice) => {
                self.preferences.practice_requested = practice;
                writeln!(out, "Practice problems: {}", yes_no(practice))?;
            }
            SessionCommand::SetModel(name) => match self.backend.orchestrator(&name, out) {
                Ok(next) => {
                    self.orchestrator = next;
                    writeln!(out, "Model set to {}", self.orchestrator.model_name())?;
                }
                Err(err) => writeln!(out, "Model change failed: {err:#}")?,
            },
            SessionCommand::Generate => {
                writeln!(out, "Solving your math problem...")?;
                match self.orchestrator.solve(&mut self.session, &self.preferences) {
                    Ok(_) => write!(out, "{}", render_result(&self.session))?,
                    Err(err) => writeln!(out, "{err}")?,
                }
            }
            SessionCommand::Show => {
                if self.session.stored().is_some() {
                    write!(out, "{}", render_result(&self.session))?;
                } else {
                    writeln!(out, "No solution yet. Upload a screenshot and /generate.")?;
                }
            }
            SessionCommand::Download(target) => {
                let target = target
                    .map(PathBuf::from)
                    .unwrap_or_else(|| self.download_dir.clone());
                match export_solution(&self.session, &target) {
                    Ok(path) => {
                        self.backend.emit(SessionEvent::SolutionExported {
                            path: path.display().to_string(),
                        });
                        writeln!(out, "📥 Saved solution to {}", path.display())?;
                    }
                    Err(err) => writeln!(out, "{err}")?,
                }
            }
            SessionCommand::Status => write!(
                out,
                "{}",
                render_status(&self.session, &self.preferences, self.orchestrator.model_name())
            )?,
            SessionCommand::Help => {
                writeln!(out, "Commands:")?;
                for line in help_lines() {
                    writeln!(out, "{line}")?;
                }
            }
            SessionCommand::Quit => return Ok(false),
            SessionCommand::Invalid { message, .. } => writeln!(out, "{message}")?,
            SessionCommand::Unknown { command, .. } if command.is_empty() => {
                writeln!(out, "Commands start with '/'. Type /help for the list.")?;
            }
            SessionCommand::Unknown { command, .. } => {
                writeln!(out, "Unknown command /{command}. Type /help for the list.")?;
            }
        }
        Ok(true)
    }
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

fn run_normalize(args: NormalizeArgs) -> Result<i32> {
    let raw = match args.input.as_deref() {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed reading {}", path.display()))?
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed reading stdin")?;
            buffer
        }
    };
    print!("{}", normalize_math_delimiters(&raw));
    io::stdout().flush()?;
    Ok(0)
}

fn describe_problem_image(upload: &UploadedImage) -> String {
    match image::load_from_memory(upload.bytes()) {
        Ok(decoded) => format!(
            "{} ({}x{}, {} bytes)",
            upload.file_name(),
            decoded.width(),
            decoded.height(),
            upload.len()
        ),
        Err(_) => format!("{} ({} bytes)", upload.file_name(), upload.len()),
    }
}

/// The result view: problem, solution, disclaimer.
fn render_result(session: &SessionState) -> String {
    let Some(stored) = session.stored() else {
        return String::new();
    };
    format!(
        "## 🖼️ Problem\n{}\n\n## 🧮 Solution\n{}\n\n{DISCLAIMER}\n",
        describe_problem_image(&stored.image),
        stored.solution.trim_end()
    )
}

fn render_status(
    session: &SessionState,
    preferences: &SolutionPreferences,
    model: &str,
) -> String {
    let image = preferences
        .uploaded_image
        .as_ref()
        .map(|image| image.file_name().to_string())
        .unwrap_or_else(|| "none".to_string());
    let solution = if session.stored().is_some() {
        format!("ready (/download writes {SOLUTION_FILE_NAME})")
    } else {
        "none".to_string()
    };
    format!(
        "API key: {}\nImage: {image}\nDetail: {}\nPractice: {}\nModel: {model}\nSolution: {solution}\n",
        if session.api_key().is_some() { "set" } else { "missing" },
        preferences.explanation_detail,
        yes_no(preferences.practice_requested),
    )
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn png_upload(width: u32, height: u32) -> UploadedImage {
        UploadedImage::from_bytes("problem.png", png_bytes(width, height)).unwrap()
    }

    #[test]
    fn solve_args_parse_detail_and_flags() {
        let cli = Cli::try_parse_from([
            "math-prodigy",
            "-v",
            "solve",
            "--image",
            "p.png",
            "--detail",
            "in-depth",
            "--practice",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        let Command::Solve(args) = cli.command else {
            panic!("expected solve");
        };
        assert_eq!(args.detail, ExplanationDetail::InDepth);
        assert!(args.practice);
        assert!(args.backend.dry_run);
        assert!(args.out.is_none());
    }

    #[test]
    fn solve_defaults_to_standard_detail() {
        let cli = Cli::try_parse_from(["math-prodigy", "solve", "--image", "p.jpg"]).unwrap();
        let Command::Solve(args) = cli.command else {
            panic!("expected solve");
        };
        assert_eq!(args.detail, ExplanationDetail::Standard);
        assert!(!args.practice);
    }

    #[test]
    fn unknown_detail_is_a_usage_error() {
        assert!(Cli::try_parse_from([
            "math-prodigy",
            "solve",
            "--image",
            "p.png",
            "--detail",
            "verbose"
        ])
        .is_err());
    }

    #[test]
    fn dry_run_conflicts_with_model() {
        assert!(Cli::try_parse_from([
            "math-prodigy",
            "session",
            "--dry-run",
            "--model",
            "gpt-4o"
        ])
        .is_err());
    }

    #[test]
    fn dry_run_backend_uses_offline_provider() -> Result<()> {
        let args = BackendArgs {
            model: None,
            dry_run: true,
            api_key: Some("sk-test".to_string()),
            events: None,
        };
        let (session, backend) = start_session(&args);
        assert_eq!(session.api_key(), Some("sk-test"));
        let mut notes = Vec::new();
        let orchestrator = backend.start(&mut notes)?;
        assert!(notes.is_empty());
        assert_eq!(orchestrator.model().name(), "dryrun");
        assert_eq!(orchestrator.model_name(), DRYRUN_MODEL);
        Ok(())
    }

    #[test]
    fn result_view_shows_problem_solution_and_disclaimer() {
        let mut session = SessionState::with_id("s");
        assert_eq!(render_result(&session), "");
        session.store_solution("Solve $x+1$=2\n".to_string(), png_upload(40, 20));

        let view = render_result(&session);
        assert!(view.starts_with("## 🖼️ Problem\nproblem.png (40x20, "));
        assert!(view.contains("## 🧮 Solution\nSolve $x+1$=2\n\n"));
        assert!(view.ends_with(&format!("{DISCLAIMER}\n")));
    }

    #[test]
    fn undecodable_problem_image_still_described() -> Result<()> {
        let image = UploadedImage::from_bytes("scan.jpg", vec![1, 2, 3])?;
        assert_eq!(describe_problem_image(&image), "scan.jpg (3 bytes)");
        Ok(())
    }

    #[test]
    fn status_never_prints_the_key() {
        let mut session = SessionState::with_id("s");
        session.set_api_key("sk-secret");
        let preferences = SolutionPreferences::new(None, ExplanationDetail::Brief, true);

        let status = render_status(&session, &preferences, "o4-mini");
        assert!(status.contains("API key: set"));
        assert!(status.contains("Detail: Brief overview"));
        assert!(status.contains("Practice: Yes"));
        assert!(status.contains("Solution: none"));
        assert!(!status.contains("sk-secret"));
    }

    #[test]
    fn one_shot_flow_exports_markdown() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let args = BackendArgs {
            model: None,
            dry_run: true,
            api_key: Some("sk-test".to_string()),
            events: Some(events_path.clone()),
        };
        let (mut session, backend) = start_session(&args);
        let mut orchestrator = backend.start(&mut io::sink())?;
        let preferences =
            SolutionPreferences::new(Some(png_upload(8, 8)), ExplanationDetail::Standard, false);

        orchestrator.solve(&mut session, &preferences)?;
        let path = export_solution(&session, temp.path())?;
        assert_eq!(path, temp.path().join(SOLUTION_FILE_NAME));
        let written = fs::read_to_string(path)?;
        assert_eq!(Some(written.as_str()), session.solution());
        assert!(written.contains("$x + 1 = 2$"));
        assert!(fs::read_to_string(events_path)?.contains("solve_completed"));
        Ok(())
    }

    #[test]
    fn scripted_session_walks_the_page() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let dir = temp.path();
        fs::write(dir.join("problem.png"), png_bytes(12, 6))?;
        let events_path = dir.join("events.jsonl");
        let args = BackendArgs {
            model: None,
            dry_run: true,
            api_key: None,
            events: Some(events_path.clone()),
        };
        let script = format!(
            "/key\n\
             /generate\n\
             /key sk-test\n\
             /upload {dir}/notes.gif\n\
             /generate\n\
             /upload \"{dir}/problem.png\"\n\
             /download\n\
             /model gpt-9\n\
             /model dryrun-vision-1\n\
             /generate\n\
             /status\n\
             /download\n\
             /frobnicate\n\
             hello\n\
             /quit\n\
             /generate\n",
            dir = dir.display()
        );

        let mut out = Vec::new();
        let mut repl = SessionRepl::start(&args, dir.to_path_buf(), &mut out)?;
        repl.run(Cursor::new(script), &mut out)?;
        let transcript = String::from_utf8(out)?;

        let expected_in_order = [
            "API key cleared.",
            "Please provide your OpenAI API key.",
            "✅ OpenAI API key updated!",
            "Upload failed: unsupported image type",
            "Please upload a math problem screenshot to proceed.",
            "Uploaded problem.png (",
            "no solution to download yet; generate one first",
            "note: Model 'gpt-9' is not in the catalogue. Using 'o4-mini'.",
            "Model set to o4-mini",
            "Model set to dryrun-vision-1",
            "## 🖼️ Problem\nproblem.png (12x6, ",
            "Practice Problems",
            "Detail: Brief overview",
            "Model: dryrun-vision-1",
            "📥 Saved solution to ",
            "Unknown command /frobnicate.",
            "Commands start with '/'.",
        ];
        let mut rest = transcript.as_str();
        for expected in expected_in_order {
            let at = rest
                .find(expected)
                .unwrap_or_else(|| panic!("missing {expected:?} in:\n{transcript}"));
            rest = &rest[at + expected.len()..];
        }
        assert_eq!(transcript.matches("## 🧮 Solution").count(), 1);

        let written = fs::read_to_string(dir.join(SOLUTION_FILE_NAME))?;
        assert_eq!(Some(written.as_str()), repl.session.solution());
        assert!(written.contains("$x + 1 = 2$"));

        let events = fs::read_to_string(events_path)?;
        let types: Vec<String> = events
            .lines()
            .filter_map(|line| {
                line.split("\"type\":\"")
                    .nth(1)
                    .and_then(|tail| tail.split('"').next())
                    .map(str::to_string)
            })
            .collect();
        assert_eq!(
            types,
            [
                "session_started",
                "solve_rejected",
                "solve_rejected",
                "solve_requested",
                "solve_completed",
                "solution_exported",
            ]
        );
        assert!(!events.contains("sk-test"));
        Ok(())
    }

    #[test]
    fn session_ends_at_end_of_input() -> Result<()> {
        let args = BackendArgs {
            model: None,
            dry_run: true,
            api_key: Some("sk-test".to_string()),
            events: None,
        };
        let mut out = Vec::new();
        let mut repl = SessionRepl::start(&args, PathBuf::from("."), &mut out)?;
        repl.run(Cursor::new("/detail in-depth\n/practice no"), &mut out)?;

        assert_eq!(repl.preferences.explanation_detail, ExplanationDetail::InDepth);
        assert!(!repl.preferences.practice_requested);
        let transcript = String::from_utf8(out)?;
        assert!(transcript.contains("Explanation detail: In-depth explanation with reasoning"));
        assert!(transcript.contains("Practice problems: No"));
        Ok(())
    }
}
