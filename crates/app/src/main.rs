use std::fmt;
use std::path::PathBuf;

use quiz_core::model::{Difficulty, EngineConfig, UnitSetId};
use services::{BadgeRules, Clock, SessionLoopService, SessionPhase, SessionRequest};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod sample;
mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidUnitSet { raw: String },
    InvalidDbUrl { raw: String },
    InvalidDifficulty { raw: String },
    InvalidCount { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidUnitSet { raw } => write!(f, "invalid --unit-set value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDifficulty { raw } => {
                write!(f, "invalid --difficulty value: {raw} (easy, medium, hard)")
            }
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- play     [--db <sqlite_url>] [--unit-set <id>] [--difficulty <level>]");
    eprintln!("                               [--count <n>] [--timed] [--units <file.json>] [--config <file.toml>]");
    eprintln!("  cargo run -p app -- progress [--db <sqlite_url>] [--unit-set <id>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  --unit-set 1 (the built-in Elder Futhark set)");
    eprintln!("  --difficulty medium");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_UNIT_SET, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Progress,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "progress" => Some(Self::Progress),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    unit_set: UnitSetId,
    difficulty: Difficulty,
    count: Option<usize>,
    timed: bool,
    units_file: Option<PathBuf>,
    config_file: Option<PathBuf>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| normalize_sqlite_url("sqlite:quiz.sqlite3".into()), normalize_sqlite_url);
        let mut unit_set = std::env::var("QUIZ_UNIT_SET")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map_or_else(|| UnitSetId::new(sample::SAMPLE_UNIT_SET), UnitSetId::new);
        let mut difficulty = Difficulty::default();
        let mut count = None;
        let mut timed = false;
        let mut units_file = None;
        let mut config_file = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--unit-set" => {
                    let value = require_value(args, "--unit-set")?;
                    let parsed: u64 = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidUnitSet { raw: value.clone() })?;
                    unit_set = UnitSetId::new(parsed);
                }
                "--difficulty" => {
                    let value = require_value(args, "--difficulty")?;
                    difficulty = Difficulty::parse(&value)
                        .ok_or(ArgsError::InvalidDifficulty { raw: value })?;
                }
                "--count" => {
                    let value = require_value(args, "--count")?;
                    let parsed: usize = value
                        .parse()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| ArgsError::InvalidCount { raw: value.clone() })?;
                    count = Some(parsed);
                }
                "--timed" => timed = true,
                "--units" => units_file = Some(PathBuf::from(require_value(args, "--units")?)),
                "--config" => config_file = Some(PathBuf::from(require_value(args, "--config")?)),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            unit_set,
            difficulty,
            count,
            timed,
            units_file,
            config_file,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn load_engine_config(path: Option<&PathBuf>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = std::fs::read_to_string(path)?;
    let config: EngineConfig = toml::from_str(&raw)?;
    config.validate()?;
    info!(path = %path.display(), "loaded engine config");
    Ok(config)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // No subcommand plays a session.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let config = load_engine_config(parsed.config_file.as_ref())?;
    let rules = BadgeRules::new().award(parsed.unit_set, 1, "First Steps");
    let service = SessionLoopService::new_sqlite(&parsed.db_url, Clock::system(), config, rules).await?;

    match cmd {
        Command::Play => {
            let units = match &parsed.units_file {
                Some(path) => sample::load_units(path)?,
                None => sample::elder_futhark(),
            };
            let mut request = SessionRequest::new(parsed.unit_set, units)
                .with_difficulty(parsed.difficulty)
                .timed(parsed.timed);
            if let Some(count) = parsed.count {
                request = request.with_question_count(count);
            }

            println!("Answer with the option number or type the sound. `:q` quits.");
            let runner = service.start_runner(request)?;
            let outcome = terminal::play(runner).await?;
            service.flush().await?;

            if matches!(outcome.phase, SessionPhase::Finished(_)) {
                print_progress(&service, parsed.unit_set).await?;
            }
            Ok(())
        }
        Command::Progress => print_progress(&service, parsed.unit_set).await,
    }
}

async fn print_progress(
    service: &SessionLoopService,
    unit_set: UnitSetId,
) -> Result<(), Box<dyn std::error::Error>> {
    match service.progress_for(unit_set).await? {
        Some(progress) => println!(
            "Unit set {unit_set}: best {} ({} stars) over {} attempts, last played {}",
            progress.best_score,
            progress.best_stars.stars(),
            progress.attempts,
            progress.last_played_at.format("%Y-%m-%d %H:%M")
        ),
        None => println!("Unit set {unit_set}: not played yet"),
    }

    for row in service.recent_attempts(unit_set, 5).await? {
        let attempt = &row.attempt;
        println!(
            "  #{} score {}/{} {} stars{}",
            attempt.attempt_number,
            attempt.total_score,
            attempt.max_possible_score,
            attempt.stars.stars(),
            if attempt.game_over { " (game over)" } else { "" }
        );
    }

    println!("Experience: {} XP", service.experience_total().await?);
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
