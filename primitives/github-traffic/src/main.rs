//! GitHub Traffic - Repository Traffic Recorder
//!
//! A Source that fetches the daily page views and clones GitHub reports for
//! a set of repositories and keeps a growing table per repository. GitHub
//! only serves the last 14 days, so running this regularly is what builds a
//! long history.
//!
//! When `--emit` is set, days recorded for the first time are published as
//! `github.traffic` events. Lifecycle events are published by the engine.
//!
//! # Usage
//!
//! ```bash
//! # Record once into ./traffic
//! github-traffic --repo octo/hello --data-dir traffic
//!
//! # Several repositories, once a day, publishing new days
//! github-traffic -r octo/hello -r octo/world -d traffic --interval 86400 --emit
//! ```
//!
//! # Events Published
//!
//! - `github.traffic` - `{owner, repo, rows}` with the newly recorded rows

use std::{
    collections::HashMap,
    error::Error,
    fmt,
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use emergent_client::{EmergentMessage, EmergentSource};
use serde_json::json;
use tokio::signal::unix::{SignalKind, signal};
use tracing_subscriber::EnvFilter;
use traffic_common::{
    Fetch, GITHUB_API_BASE, GithubApi, TrafficRow, TrafficTable, build_client, build_table, store,
};

const MAX_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

/// GitHub traffic recorder.
#[derive(Parser, Debug, Clone)]
#[command(name = "github-traffic")]
#[command(about = "Records GitHub repository views and clones")]
struct Args {
    /// Repository to record, as owner/name. Repeat for several.
    #[arg(
        short = 'r',
        long = "repo",
        env = "GITHUB_TRAFFIC_REPOS",
        value_delimiter = ',',
        required = true
    )]
    repos: Vec<RepoSlug>,

    /// GitHub personal access token with access to the repositories.
    #[arg(short, long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Directory holding one recorded table per repository.
    /// Without it tables are only kept in memory between cycles.
    #[arg(short, long, env = "GITHUB_TRAFFIC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// GitHub API endpoint.
    #[arg(long, env = "GITHUB_TRAFFIC_BASE_URL", default_value = GITHUB_API_BASE)]
    base_url: String,

    /// Request timeout in seconds (1 to 3600).
    #[arg(
        long,
        env = "GITHUB_TRAFFIC_TIMEOUT",
        default_value = "30",
        value_parser = clap::value_parser!(u64).range(1..=3600)
    )]
    timeout: u64,

    /// Seconds between recording cycles (0 = run once, at most 30 days).
    #[arg(
        short,
        long,
        env = "GITHUB_TRAFFIC_INTERVAL",
        default_value = "0",
        value_parser = clap::value_parser!(u64).range(0..=MAX_INTERVAL_SECS)
    )]
    interval: u64,

    /// Publish newly recorded days to the Emergent engine.
    #[arg(short, long, env = "GITHUB_TRAFFIC_EMIT")]
    emit: bool,
}

/// A repository named `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RepoSlug {
    owner: String,
    name: String,
}

impl FromStr for RepoSlug {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(format!("expected owner/name, got `{s}`")),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Payload for github.traffic events.
#[derive(Debug, serde::Serialize)]
struct TrafficPayload<'a> {
    owner: &'a str,
    repo: &'a str,
    rows: &'a [TrafficRow],
}

/// Keeps the recorded table of every repository between cycles.
///
/// With a data directory the tables live on disk; without one they are kept
/// in memory for as long as the process runs.
struct Recorder<F> {
    api: F,
    data_dir: Option<PathBuf>,
    memory: HashMap<RepoSlug, TrafficTable>,
}

impl<F: Fetch> Recorder<F> {
    fn new(api: F, data_dir: Option<PathBuf>) -> Self {
        Self {
            api,
            data_dir,
            memory: HashMap::new(),
        }
    }

    /// Records one repository and returns the rows seen for the first time.
    async fn record(&mut self, slug: &RepoSlug) -> Result<Vec<TrafficRow>, Box<dyn Error>> {
        let path = self
            .data_dir
            .as_deref()
            .map(|dir| store::table_path(dir, &slug.owner, &slug.name));
        let old = match &path {
            Some(path) => store::load_table(path)?,
            None => self.memory.get(slug).cloned(),
        };

        let Some(table) = build_table(&self.api, &slug.owner, &slug.name, old.clone()).await?
        else {
            tracing::info!(repo = %slug, "no traffic recorded");
            return Ok(Vec::new());
        };

        let added = match &old {
            Some(old) => table.rows_not_in(old),
            None => table.rows().to_vec(),
        };
        tracing::info!(repo = %slug, total = table.len(), added = added.len(), "recorded traffic");

        if old.as_ref() == Some(&table) {
            return Ok(added);
        }
        match &path {
            Some(path) => store::save_table(path, &table)?,
            None => {
                self.memory.insert(slug.clone(), table);
            }
        }

        Ok(added)
    }

    /// Runs one cycle over every repository and returns how many failed.
    async fn record_all(&mut self, repos: &[RepoSlug], source: Option<&EmergentSource>) -> usize {
        let mut failures = 0;

        for slug in repos {
            match self.record(slug).await {
                Ok(added) => {
                    if let Some(source) = source {
                        publish(source, slug, &added).await;
                    }
                }
                Err(e) => {
                    tracing::error!(repo = %slug, "failed to record traffic: {e}");
                    failures += 1;
                }
            }
        }

        failures
    }
}

/// Publishes newly recorded rows as a github.traffic event.
async fn publish(source: &EmergentSource, slug: &RepoSlug, added: &[TrafficRow]) {
    if added.is_empty() {
        return;
    }

    let payload = TrafficPayload {
        owner: &slug.owner,
        repo: &slug.name,
        rows: added,
    };
    let message = EmergentMessage::new("github.traffic").with_payload(json!(payload));
    if let Err(e) = source.publish(message).await {
        tracing::warn!(repo = %slug, "failed to publish traffic: {e}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let client = build_client(Duration::from_secs(args.timeout))?;
    let api = GithubApi::new(client, args.token.clone()).with_base_url(&args.base_url);
    let mut recorder = Recorder::new(api, args.data_dir.clone());

    let source = if args.emit {
        // Get the source name from environment (set by engine) or use default
        let name = std::env::var("EMERGENT_NAME").unwrap_or_else(|_| "github-traffic".to_string());

        match EmergentSource::connect(&name).await {
            Ok(s) => Some(s),
            Err(e) => {
                eprintln!("Failed to connect to Emergent engine: {e}");
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    if args.interval == 0 {
        // Run once and exit
        let failures = recorder.record_all(&args.repos, source.as_ref()).await;
        if let Some(source) = &source {
            let _ = source.disconnect().await;
        }
        if failures > 0 {
            return Err(format!("{failures} of {} repositories failed", args.repos.len()).into());
        }
    } else {
        // Set up SIGTERM handler for graceful shutdown
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut interval = tokio::time::interval(Duration::from_secs(args.interval));

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    if let Some(source) = &source {
                        let _ = source.disconnect().await;
                    }
                    break;
                }

                _ = interval.tick() => {
                    let failures = recorder.record_all(&args.repos, source.as_ref()).await;
                    if failures > 0 {
                        tracing::warn!(failures, "recording cycle finished with failures");
                    }
                }
            }
        }
    }

    Ok(())
}
