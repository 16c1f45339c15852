//! Entry point for the sentrydash dashboard. Parses args, resolves the
//! connection profile, then runs the TUI or the headless log loop.

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use sentrydash::api::HttpBackend;
use sentrydash::app::App;
use sentrydash::clock::{Clock, SystemClock};
use sentrydash::engine::{Controller, EngineConfig};
use sentrydash::predictions::{DEFAULT_HORIZON_HOURS, HORIZON_CHOICES};
use sentrydash::profiles::{
    config_dir, load_profiles, save_profiles, ProfileEntry, ProfileRequest, ProfilesFile,
    ResolveProfile,
};
use sentrydash::sink::LogSink;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "[--tls-ca CERT_PEM|-t CERT_PEM] [--profile NAME|-P NAME] [--save] [--headless] [--hours N|-H N] [--log-file PATH] [--dry-run] [http://HOST:PORT]";
const LOG_ENV: &str = "SENTRYDASH_LOG";

#[derive(Debug, Default, PartialEq)]
struct ParsedArgs {
    url: Option<String>,
    tls_ca: Option<String>,
    profile: Option<String>,
    save: bool,
    headless: bool,
    hours: Option<u32>,
    log_file: Option<PathBuf>,
    dry_run: bool,
}

#[derive(Debug, PartialEq)]
enum ArgsError {
    Help(String),
    Invalid(String),
}

fn parse_hours(v: &str) -> Result<u32, String> {
    match v.parse::<u32>() {
        Ok(h) if HORIZON_CHOICES.contains(&h) => Ok(h),
        _ => Err(format!("--hours must be one of 6, 12, 24 (got '{v}')")),
    }
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, ArgsError> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "sentrydash".into());
    let usage = || format!("Usage: {prog} {USAGE}");
    let mut out = ParsedArgs::default();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(ArgsError::Help(usage())),
            "--tls-ca" | "-t" => out.tls_ca = it.next(),
            "--profile" | "-P" => out.profile = it.next(),
            "--save" => out.save = true,
            "--headless" => out.headless = true,
            "--dry-run" => out.dry_run = true,
            "--log-file" => out.log_file = it.next().map(PathBuf::from),
            "--hours" | "-H" => {
                let v = it.next().unwrap_or_default();
                out.hours = Some(parse_hours(&v).map_err(ArgsError::Invalid)?);
            }
            _ if arg.starts_with("--tls-ca=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        out.tls_ca = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        out.profile = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--hours=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    out.hours = Some(parse_hours(v).map_err(ArgsError::Invalid)?);
                }
            }
            _ if arg.starts_with('-') => {
                return Err(ArgsError::Invalid(format!(
                    "Unknown option '{arg}'. {}",
                    usage()
                )));
            }
            _ => {
                if out.url.is_none() {
                    out.url = Some(arg);
                } else {
                    return Err(ArgsError::Invalid(format!(
                        "Unexpected argument. {}",
                        usage()
                    )));
                }
            }
        }
    }
    Ok(out)
}

/// Headless logs go to stderr; the TUI owns the terminal, so it logs to a file.
fn init_tracing(headless: bool, log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init()
            .map_err(|e| anyhow::anyhow!("init logging: {e}"))?;
        return Ok(());
    }
    let path = log_file.unwrap_or_else(|| config_dir().join("sentrydash.log"));
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log dir {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| anyhow::anyhow!("init logging: {e}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(ArgsError::Help(msg)) => {
            eprintln!("{msg}");
            return Ok(());
        }
        Err(ArgsError::Invalid(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };

    let Some(entry) = resolve_connection(&parsed)? else {
        return Ok(());
    };
    let hours = entry.prediction_hours.unwrap_or(DEFAULT_HORIZON_HOURS);

    if parsed.dry_run {
        println!(
            "url={} tls_ca={} hours={hours}",
            entry.url,
            entry.tls_ca.as_deref().unwrap_or("-")
        );
        return Ok(());
    }

    init_tracing(parsed.headless, parsed.log_file.clone())?;

    let backend = HttpBackend::new(&entry.url, entry.tls_ca.as_deref())
        .with_context(|| format!("backend {}", entry.url))?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let config = EngineConfig {
        prediction_hours: hours,
        ..EngineConfig::default()
    };
    let mut controller = Controller::new(Arc::new(backend), config, clock.clone());
    info!(url = %entry.url, hours, headless = parsed.headless, "starting dashboard");

    if parsed.headless {
        let mut sink = LogSink;
        controller
            .run(&mut sink, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await;
        return Ok(());
    }

    let mut app = App::new(controller, clock);
    app.run().await
}

fn persist(profiles: &mut ProfilesFile, name: &str, entry: &ProfileEntry) {
    profiles.profiles.insert(name.to_string(), entry.clone());
    if let Err(e) = save_profiles(profiles) {
        eprintln!("Could not save profile '{name}': {e}");
    }
}

/// Work out what to connect to, saving or prompting for profiles on the way.
/// `None` means the user aborted or nothing was given.
fn resolve_connection(parsed: &ParsedArgs) -> anyhow::Result<Option<ProfileEntry>> {
    let mut profiles = load_profiles();
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url: parsed.url.clone(),
        tls_ca: parsed.tls_ca.clone(),
        prediction_hours: parsed.hours,
    };
    let entry = match req.resolve(&profiles) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = parsed.profile.as_deref() {
                match profiles.profiles.get(name).map(|e| *e != entry) {
                    // new profile: save immediately
                    None => persist(&mut profiles, name, &entry),
                    Some(true) => {
                        let overwrite = parsed.save
                            || prompt_yes_no(&format!(
                                "Overwrite existing profile '{name}'? [y/N]: "
                            ));
                        if overwrite {
                            persist(&mut profiles, name, &entry);
                        }
                    }
                    Some(false) => {}
                }
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(names) => {
            eprintln!("Select profile:");
            for (i, n) in names.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, n);
            }
            let line = prompt_string("Enter number (or blank to abort): ")?;
            let picked = line
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|i| (1..=names.len()).contains(i))
                .and_then(|i| profiles.profiles.get(&names[i - 1]));
            match picked {
                Some(entry) => entry.clone(),
                None => return Ok(None),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter URL (http://HOST:PORT or https://...): ")?;
            if url.trim().is_empty() {
                return Ok(None);
            }
            let ca = prompt_string("Enter TLS CA path (or leave blank): ")?;
            let entry = ProfileEntry {
                url: url.trim().to_string(),
                tls_ca: Some(ca.trim().to_string()).filter(|c| !c.is_empty()),
                prediction_hours: parsed.hours,
            };
            persist(&mut profiles, &name, &entry);
            entry
        }
        ResolveProfile::None => {
            eprintln!("No URL provided and no profiles to select.");
            return Ok(None);
        }
    };
    Ok(Some(entry))
}

fn prompt_yes_no(prompt: &str) -> bool {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_ok() {
        matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    } else {
        false
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}
