use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use spl_stats::calculator::View;
use spl_stats::config::{Settings, StoreBackend};
use spl_stats::documents::load_state;
use spl_stats::match_feed::ScoresApi;
use spl_stats::pipeline::{self, RunSummary};
use spl_stats::report::{DEFAULT_TOP_N, render_report};
use spl_stats::store::{DocumentStore, GistStore, SqliteStore};

const USAGE: &str = "usage: spl_stats [update|audit|rebuild|schedule|report [overall|home|away]] \
                     [--db=<path>] [--top=<n>]";

const VALUE_FLAGS: &[&str] = &["--db", "--top"];

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        println!("{USAGE}");
        return Ok(());
    }
    let positional = positional_args(&args);
    let command = positional.first().copied().unwrap_or("update");

    let settings = Settings::from_env()
        .context("invalid configuration")?
        .with_db_override(flag_value(&args, "--db").map(PathBuf::from));
    let store = open_store(&settings.backend)?;

    if command == "report" {
        let view = match positional.get(1) {
            Some(raw) => View::parse(raw).with_context(|| format!("unknown view `{raw}`"))?,
            None => View::Overall,
        };
        let top = flag_value(&args, "--top")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_N)
            .clamp(1, 200);
        let state = load_state(store.as_ref(), &settings.documents)?;
        print!("{}", render_report(&state, view, top));
        return Ok(());
    }

    let api = ScoresApi::new(&settings.api)?;
    let summary = match command {
        "update" => pipeline::run_update(&api, store.as_ref(), &settings)?,
        "audit" => pipeline::run_audit(&api, store.as_ref(), &settings)?,
        "rebuild" => pipeline::run_rebuild(&api, store.as_ref(), &settings)?,
        "schedule" => pipeline::run_schedule(&api, store.as_ref(), &settings)?,
        other => bail!("unknown command `{other}`\n{USAGE}"),
    };
    print_summary(command, &summary);
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("spl_stats=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn open_store(backend: &StoreBackend) -> Result<Box<dyn DocumentStore>> {
    match backend {
        StoreBackend::Sqlite { path } => {
            let store = SqliteStore::open(path)?;
            Ok(Box::new(store))
        }
        StoreBackend::Gist { api_base, token } => Ok(Box::new(GistStore::new(api_base, token)?)),
    }
}

fn print_summary(command: &str, summary: &RunSummary) {
    println!("{command} complete");
    println!("Games considered: {}", summary.considered);
    println!("Processed: {}", summary.processed);
    if summary.failed > 0 {
        println!("Failed: {} (see build report)", summary.failed);
    }
    if summary.warnings > 0 {
        println!("New warnings: {}", summary.warnings);
    }
    if command == "audit" {
        println!("Corrections: {}", summary.corrections);
    }
    if !summary.written {
        println!("Store unchanged");
    }
}

fn positional_args(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUE_FLAGS.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(arg.as_str());
    }
    out
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
