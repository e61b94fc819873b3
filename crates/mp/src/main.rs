//! mp - macroplay CLI
//!
//! Inspect, edit and dry-run saved macros. Every command prints JSON on
//! stdout; logs go to stderr.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use macroplay::error::{Error, ErrorCode};
use macroplay::prelude::*;

#[derive(Parser)]
#[command(name = "mp")]
#[command(about = "macroplay - inspect, edit and dry-run desktop macros")]
#[command(version)]
struct Cli {
    /// Data directory (default: $MACROPLAY_HOME or ~/.macroplay)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List saved records
    List,
    /// Show a record's actions
    Show {
        name: String,
        #[arg(long)]
        all: bool,
    },
    /// Check that a record can be played
    Validate { name: String },
    /// Dry-run a record: inputs are logged, not sent
    Play {
        name: String,
        /// 1-based action number to start each cycle from
        #[arg(long)]
        from: Option<usize>,
        /// Virtual desktop size
        #[arg(long, default_value = "1920x1080")]
        desktop: String,
        /// Window of the bound process as X,Y,W,H
        #[arg(long)]
        window: Option<String>,
        /// Executable to resolve instead of the saved one, for this run only
        #[arg(long)]
        exe_override: Option<String>,
        /// Stop phrase for this run (overrides settings)
        #[arg(long)]
        stop_word: Option<String>,
    },
    /// Delete a record
    Delete { name: String },
    /// Copy a record under a new name
    Duplicate { name: String, new_name: String },
    /// Import records from a JSON file
    Import { file: PathBuf },
    /// Export one record to a JSON file
    Export { name: String, file: Option<PathBuf> },
    /// Stop-word settings
    StopWord {
        #[command(subcommand)]
        action: StopWordCommand,
    },
}

#[derive(Subcommand)]
enum StopWordCommand {
    /// Set the stop phrase
    Set {
        word: String,
        /// Seconds between checks
        #[arg(long, default_value = "10")]
        interval: f64,
        #[arg(long)]
        lang: Option<String>,
    },
    Clear,
    Enable,
    Disable,
    Show,
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Error>,
}

impl<T: Serialize> Output<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
    fn err(e: Error) -> Output<()> {
        Output { success: false, data: None, error: Some(e) }
    }
}

fn print_json<T: Serialize>(output: &T) {
    match serde_json::to_string_pretty(output) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Error: {}", e),
    }
}

// ── Main ────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let dir = cli.data_dir;
    let result = match cli.command {
        Commands::List => list(dir),
        Commands::Show { name, all } => show(dir, &name, all),
        Commands::Validate { name } => validate(dir, &name),
        Commands::Play { name, from, desktop, window, exe_override, stop_word } => play(
            dir,
            &name,
            PlayArgs { from, desktop, window, exe_override, stop_word },
        ),
        Commands::Delete { name } => delete(dir, &name),
        Commands::Duplicate { name, new_name } => duplicate(dir, &name, &new_name),
        Commands::Import { file } => import(dir, &file),
        Commands::Export { name, file } => export(dir, &name, file),
        Commands::StopWord { action } => stop_word(dir, action),
    };

    if let Err(e) = result {
        let err = match e.downcast::<Error>() {
            Ok(err) => err,
            Err(other) => Error::from(other),
        };
        print_json(&Output::<()>::err(err));
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn records(dir: Option<PathBuf>) -> Result<RecordStorage> {
    match dir {
        Some(d) => RecordStorage::with_dir(d),
        None => RecordStorage::new(),
    }
}

fn settings(dir: Option<PathBuf>) -> Result<SettingsStorage> {
    match dir {
        Some(d) => SettingsStorage::with_dir(d),
        None => SettingsStorage::new(),
    }
}

fn load(storage: &RecordStorage, name: &str) -> Result<Record> {
    Ok(storage.find(name)?.ok_or_else(|| Error::record_not_found(name))?)
}

// ── Records ─────────────────────────────────────────────────────────────────

fn list(dir: Option<PathBuf>) -> Result<()> {
    let storage = records(dir)?;
    let rows: Vec<serde_json::Value> = storage
        .load_all()?
        .iter()
        .map(|r| {
            serde_json::json!({
                "name": r.name,
                "actions": r.actions.len(),
                "repeat": r.repeat.label(r.repeat.count),
                "bound_exe": r.binding.effective_exe(),
            })
        })
        .collect();
    print_json(&Output::ok(rows));
    Ok(())
}

fn show(dir: Option<PathBuf>, name: &str, all: bool) -> Result<()> {
    let storage = records(dir)?;
    let record = load(&storage, name)?;
    let limit = if all { usize::MAX } else { 20 };
    let actions: Vec<serde_json::Value> = record
        .actions
        .iter()
        .enumerate()
        .take(limit)
        .map(|(i, a)| {
            let (title, detail) = a.summary();
            serde_json::json!({ "n": i + 1, "type": a.type_name(), "title": title, "detail": detail })
        })
        .collect();
    print_json(&Output::ok(serde_json::json!({
        "name": record.name,
        "move_mouse": record.move_mouse,
        "repeat": record.repeat.label(record.repeat.count),
        "bound_exe": record.binding.effective_exe(),
        "total_actions": record.actions.len(),
        "steps": record.total_steps(0),
        "actions": actions,
    })));
    Ok(())
}

fn validate(dir: Option<PathBuf>, name: &str) -> Result<()> {
    let storage = records(dir)?;
    let record = load(&storage, name)?;
    record.validate()?;
    print_json(&Output::ok(serde_json::json!({
        "name": record.name,
        "valid": true,
        "requires_ocr": record.requires_ocr(),
    })));
    Ok(())
}

fn delete(dir: Option<PathBuf>, name: &str) -> Result<()> {
    records(dir)?.delete(name)?;
    print_json(&Output::ok(serde_json::json!({ "deleted": name })));
    Ok(())
}

fn duplicate(dir: Option<PathBuf>, name: &str, new_name: &str) -> Result<()> {
    let copy = records(dir)?.duplicate(name, new_name)?;
    print_json(&Output::ok(serde_json::json!({ "created": copy.name })));
    Ok(())
}

fn import(dir: Option<PathBuf>, file: &PathBuf) -> Result<()> {
    let names = records(dir)?.import(file)?;
    print_json(&Output::ok(serde_json::json!({ "imported": names })));
    Ok(())
}

fn export(dir: Option<PathBuf>, name: &str, file: Option<PathBuf>) -> Result<()> {
    let storage = records(dir)?;
    let path = match file {
        Some(f) => f,
        None => RecordStorage::export_path(std::env::current_dir()?, name),
    };
    let path = storage.export(name, path)?;
    print_json(&Output::ok(serde_json::json!({ "path": path })));
    Ok(())
}

// ── Playback ────────────────────────────────────────────────────────────────

struct PlayArgs {
    from: Option<usize>,
    desktop: String,
    window: Option<String>,
    exe_override: Option<String>,
    stop_word: Option<String>,
}

fn parse_size(s: &str) -> Result<(i32, i32)> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .with_context(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    Ok((w.trim().parse()?, h.trim().parse()?))
}

fn parse_window(s: &str) -> Result<Rect> {
    let parts: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("expected X,Y,W,H, got '{}'", s))?;
    match parts.as_slice() {
        [x, y, w, h] => Ok(Rect::from_size(*x, *y, *w, *h)),
        _ => bail!("expected X,Y,W,H, got '{}'", s),
    }
}

fn play(dir: Option<PathBuf>, name: &str, args: PlayArgs) -> Result<()> {
    let storage = records(dir.clone())?;
    let mut record = load(&storage, name)?;
    if let Some(exe) = args.exe_override {
        record.binding.exe_override = exe;
    }

    let (w, h) = parse_size(&args.desktop)?;
    let mut windows = StaticWindows::new(Rect::from_size(0, 0, w, h));
    if let (Some(spec), Some(exe)) = (args.window.as_deref(), record.binding.effective_exe()) {
        windows = windows.with_window(exe, parse_window(spec)?, 1.0);
    }

    let saved = settings(dir)?.load();
    let stop_word = match args.stop_word {
        Some(word) => Some(StopWordConfig::new(TextSearch::new(word, Region::default()))),
        None if saved.stop_word_enabled => saved.stop_word,
        None => None,
    };

    let player = Player::new(Collaborators {
        input: Arc::new(LoggingInjector::new()),
        text: Arc::new(NoTextLocator),
        window: Arc::new(windows),
    });
    let options = PlayOptions {
        start_index: args.from.map_or(0, |n| n.saturating_sub(1)),
        stop_word,
        stop_word_enabled: None,
    };
    let handle = player.start(record, options)?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))?;

    let mut stopping = false;
    loop {
        if !stopping && !running.load(Ordering::SeqCst) {
            stopping = true;
            handle.stop();
        }
        let Some(event) = handle.recv_timeout(Duration::from_millis(50)) else {
            if handle.is_running() {
                continue;
            }
            break;
        };
        println!("{}", serde_json::to_string(&event)?);
        if matches!(event, PlayerEvent::Finished { .. }) {
            break;
        }
    }

    let outcome = handle.join();
    if outcome.state == EndState::Error {
        return Err(Error::new(ErrorCode::UnexpectedFault, outcome.reason).into());
    }
    print_json(&Output::ok(outcome));
    Ok(())
}

// ── Settings ────────────────────────────────────────────────────────────────

fn stop_word(dir: Option<PathBuf>, action: StopWordCommand) -> Result<()> {
    let storage = settings(dir)?;
    let mut s = storage.load();
    match action {
        StopWordCommand::Set { word, interval, lang } => {
            if word.trim().is_empty() {
                return Err(Error::configuration("Stop word is empty").into());
            }
            let mut cfg = StopWordConfig::new(TextSearch::new(word, Region::default()));
            cfg.interval_sec = interval;
            if let Some(lang) = lang {
                cfg.search.ocr_lang = lang;
            }
            s.stop_word = Some(cfg);
        }
        StopWordCommand::Clear => {
            s.stop_word = None;
            s.stop_word_enabled = false;
        }
        StopWordCommand::Enable => {
            if s.stop_word.as_ref().map_or(true, |c| !c.is_usable()) {
                return Err(Error::configuration("No stop word set; use `mp stop-word set <word>` first").into());
            }
            s.stop_word_enabled = true;
        }
        StopWordCommand::Disable => s.stop_word_enabled = false,
        StopWordCommand::Show => {}
    }
    storage.save(&s)?;
    print_json(&Output::ok(s));
    Ok(())
}
