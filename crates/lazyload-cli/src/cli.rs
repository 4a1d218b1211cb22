//! Command-line surface of the `lazyload` binary.

use crate::fetcher::HttpFetcher;
use crate::headless::HeadlessDocument;
use crate::less::PassthroughLess;
use crate::output::{self, Styled};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lazyload::{classify, AssetRequest, Attempts, Loader, LoaderConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "lazyload",
    version,
    about = "Load JS, CSS and LESS assets with dependencies and fallbacks"
)]
pub struct Cli {
    /// Print machine-readable JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress the human-readable report
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log every settled asset
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a batch of requests over HTTP and report how each settled
    Load(LoadArgs),

    /// Show how requests are split into chain links and fallbacks
    Parse {
        /// Request strings, e.g. "app.js < jquery.js|jquery-local.js"
        #[arg(required = true)]
        requests: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Request strings, e.g. "app.js < jquery.js|jquery-local.js"
    #[arg(required = true)]
    pub requests: Vec<String>,

    /// Base URL relative addresses are resolved against
    #[arg(long)]
    pub base_url: Option<String>,

    /// JSON loader configuration
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Per-request HTTP timeout
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Override the number of script failure checks (-1 for unlimited)
    #[arg(long, allow_hyphen_values = true)]
    pub retry_times: Option<i64>,

    /// Override the delay between script failure checks
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
}

impl LoadArgs {
    /// Effective loader configuration: file first, then flag overrides.
    pub fn loader_config(&self) -> Result<LoaderConfig> {
        let mut config = match &self.config {
            Some(path) => LoaderConfig::from_file(path)?,
            None => LoaderConfig::default(),
        };
        if let Some(times) = self.retry_times {
            config.script_retry.times = Attempts::from(times);
        }
        if let Some(delay) = self.retry_delay_ms {
            config.script_retry.delay_ms = delay;
        }
        Ok(config)
    }
}

/// Dispatch a parsed command line. Returns whether every request was satisfied.
pub async fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Command::Load(args) => run_load(&args).await,
        Command::Parse { requests } => {
            run_parse(&requests);
            Ok(true)
        }
    }
}

/// Load the requests against a headless document.
pub async fn run_load(args: &LoadArgs) -> Result<bool> {
    let config = args.loader_config()?;
    let fetcher = HttpFetcher::new(
        args.base_url.as_deref(),
        Duration::from_millis(args.timeout_ms),
    )
    .context("failed to set up HTTP client")?;
    let fetcher = Arc::new(fetcher);
    let document = HeadlessDocument::new(fetcher.clone());

    let loader = Loader::builder(document.clone())
        .fetcher(fetcher)
        .less_compiler(Arc::new(PassthroughLess))
        .config(config)
        .on_asset(|spec, outcome| {
            tracing::debug!(asset = %spec, satisfied = outcome.is_satisfied(), "asset settled");
        })
        .build();

    let requests: Vec<AssetRequest> = args
        .requests
        .iter()
        .map(|r| AssetRequest::parse(r))
        .collect();
    let report = tokio::select! {
        report = loader.load_all(requests) => report,
        _ = tokio::signal::ctrl_c() => {
            loader.cancel();
            anyhow::bail!("interrupted");
        }
    };
    let head = document.snapshot();

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "report": report,
            "head": head,
        }));
    } else if !output::is_quiet() {
        output::print_report(&Styled::new(), &report, &head);
    }
    Ok(report.all_satisfied())
}

/// Print the structure of each request without loading anything.
pub fn run_parse(requests: &[String]) {
    let parsed: Vec<AssetRequest> = requests.iter().map(|r| AssetRequest::parse(r)).collect();

    if output::is_json() {
        let value: Vec<serde_json::Value> = parsed
            .iter()
            .map(|request| {
                let order: Vec<serde_json::Value> = request
                    .load_order()
                    .map(|link| {
                        let candidates: Vec<serde_json::Value> = link
                            .candidates()
                            .map(|c| match classify(c) {
                                Ok(desc) => serde_json::json!({
                                    "address": c,
                                    "path": desc.path,
                                    "kind": desc.kind().map(|k| k.to_string()),
                                }),
                                Err(e) => serde_json::json!({
                                    "address": c,
                                    "error": e.to_string(),
                                }),
                            })
                            .collect();
                        serde_json::json!({ "link": link.to_string(), "candidates": candidates })
                    })
                    .collect();
                serde_json::json!({ "request": request.to_string(), "load_order": order })
            })
            .collect();
        output::print_json(&serde_json::Value::Array(value));
        return;
    }

    let s = Styled::new();
    for request in &parsed {
        output::print_section(&s, &request.to_string());
        if request.is_empty() {
            eprintln!("    {}", s.dim("(empty)"));
        }
        for (step, link) in request.load_order().enumerate() {
            eprintln!("    {}. {}", step + 1, link);
            for candidate in link.candidates() {
                match classify(candidate) {
                    Ok(desc) => {
                        let kind = desc
                            .kind()
                            .map(|k| k.to_string())
                            .unwrap_or_else(|| format!("unsupported .{}", desc.extension));
                        output::print_detail(&format!("{candidate}  {}", s.dim(&kind)));
                    }
                    Err(e) => output::print_detail(&s.red(&e.to_string())),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_args() {
        let cli = Cli::try_parse_from([
            "lazyload",
            "load",
            "--base-url",
            "http://localhost:8080/",
            "--retry-times",
            "-1",
            "app.js < lib.js",
            "theme.css",
        ])
        .unwrap();
        let Command::Load(args) = cli.command else {
            panic!("expected load");
        };
        assert_eq!(args.requests, vec!["app.js < lib.js", "theme.css"]);
        assert_eq!(args.base_url.as_deref(), Some("http://localhost:8080/"));
        assert_eq!(args.loader_config().unwrap().script_retry.times, Attempts::Unlimited);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["lazyload", "parse", "a.js", "--json", "-v"]).unwrap();
        assert!(cli.json);
        assert!(cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_requests_required() {
        assert!(Cli::try_parse_from(["lazyload", "load"]).is_err());
    }

    #[test]
    fn test_config_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lazyload.json");
        std::fs::write(&path, r#"{ "script_retry": { "times": 4, "delay_ms": 20 } }"#).unwrap();

        let args = LoadArgs {
            requests: vec!["a.js".into()],
            base_url: None,
            config: Some(path),
            timeout_ms: 1000,
            retry_times: None,
            retry_delay_ms: Some(5),
        };
        let config = args.loader_config().unwrap();
        assert_eq!(config.script_retry.times, Attempts::Limited(4));
        assert_eq!(config.script_retry.delay_ms, 5);
    }
}
