//! CLI parsing and orchestration. Parses args, sets up logging and the HTTP session, runs one
//! extractor, and routes its table to the console or a file. Maps errors to exit codes.

use crate::config::{self, Config, Paths};
use crate::logging::{self, LogSettings};
use crate::output::{control_output, OutputError, OutputMode, OutputRequest};
use crate::scraper::{
    extract, CachedSession, ExtractOptions, Mode, ScraperError, Session, MAIN_DOC_URL, PEP_URL,
};
use clap::Parser;
use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Output(#[from] OutputError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Output(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pydoc-scrape")]
#[command(about = "Python documentation parser")]
#[command(
    after_help = "Config file keys (base_dir, docs_url, pep_url, user_agent, timeout_secs, cache_expire_secs, log_max_bytes, log_backups) are read from ./pydoc-scrape.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// Parser mode: whats-new, latest-versions, download, or pep.
    #[arg(value_parser = parse_mode)]
    pub mode: Mode,

    /// Clear the HTTP response cache before running.
    #[arg(short, long)]
    pub clear_cache: bool,

    /// Additional output: pretty (aligned table) or file (CSV under results/). Default: plain lines.
    #[arg(short, long, value_parser = parse_output)]
    pub output: Option<OutputMode>,

    /// Base directory for logs, results, downloads, and the HTTP cache (overrides config).
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Hide the progress bar.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

fn parse_mode(s: &str) -> Result<Mode, String> {
    Mode::ALL
        .into_iter()
        .find(|m| m.name() == s.to_lowercase())
        .ok_or_else(|| {
            format!(
                "Invalid mode: '{}'. Use whats-new, latest-versions, download, or pep.",
                s
            )
        })
}

fn parse_output(s: &str) -> Result<OutputMode, String> {
    match s.to_lowercase().as_str() {
        "pretty" => Ok(OutputMode::Pretty),
        "file" => Ok(OutputMode::File),
        _ => Err(format!(
            "Invalid --output value: '{}'. Use pretty or file.",
            s
        )),
    }
}

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Base directory: --base-dir, then config, then the current directory.
fn resolve_base_dir(args: &Args, config: &Config) -> Result<PathBuf, CliRunError> {
    match args.base_dir.clone().or_else(|| config.base_dir.clone()) {
        Some(dir) => Ok(dir),
        None => std::env::current_dir().map_err(|e| {
            CliRunError::InvalidInput(format!("Cannot determine current directory: {}", e))
        }),
    }
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config()
        .map_err(CliRunError::InvalidInput)?
        .unwrap_or_default();
    let paths = Paths::new(resolve_base_dir(args, &config)?);

    let dispatch = logging::init(&LogSettings {
        dir: paths.logs(),
        max_bytes: config.log_max_bytes.unwrap_or(logging::DEFAULT_MAX_BYTES),
        backups: config.log_backups.unwrap_or(logging::DEFAULT_BACKUPS),
    });
    tracing::dispatcher::with_default(&dispatch, || {
        logged_run(args, || {
            let mut session = build_session(args, &config, &paths)?;
            let stdout = io::stdout();
            execute(args, &config, &paths, &mut session, &mut stdout.lock())
        })
    })
}

/// Log the start, the parsed arguments, and how the run ended around `body`.
fn logged_run(
    args: &Args,
    body: impl FnOnce() -> Result<(), CliRunError>,
) -> Result<(), CliRunError> {
    info!("parser started");
    info!(?args, "command-line arguments");
    let result = body();
    match &result {
        Ok(()) => info!("parser finished"),
        Err(e) => error!(error = %e, "parser failed"),
    }
    result
}

fn build_session(
    args: &Args,
    config: &Config,
    paths: &Paths,
) -> Result<CachedSession, CliRunError> {
    let timeout_secs = args
        .timeout
        .or(config.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let user_agent = args.user_agent.clone().or_else(|| config.user_agent.clone());

    let mut builder = CachedSession::builder()
        .timeout_secs(timeout_secs)
        .cache_dir(paths.cache())
        .cache_expire_secs(config.cache_expire_secs);
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    Ok(builder.build()?)
}

fn execute<W: Write>(
    args: &Args,
    config: &Config,
    paths: &Paths,
    session: &mut dyn Session,
    out: &mut W,
) -> Result<(), CliRunError> {
    if args.clear_cache {
        let removed = session.clear_cache()?;
        info!(removed, "HTTP cache cleared");
    }

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: u64, total: u64| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total);
            if let Ok(style) = indicatif::ProgressStyle::default_bar()
                .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
            {
                bar.set_style(
                    style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                        .progress_chars("█▉▊▋▌▍▎▏ "),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_position(n);
        pb.set_message(format!("Fetching page {}/{}", n, total));
    };
    let progress: Option<&dyn Fn(u64, u64)> = if args.quiet { None } else { Some(&progress_cb) };

    let options = ExtractOptions {
        docs_url: config
            .docs_url
            .clone()
            .unwrap_or_else(|| MAIN_DOC_URL.to_string()),
        pep_url: config
            .pep_url
            .clone()
            .unwrap_or_else(|| PEP_URL.to_string()),
        downloads_dir: paths.downloads(),
        progress,
    };
    let result = extract(args.mode, session, &options);

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    if let Some(table) = result? {
        let results_dir = paths.results();
        let request = OutputRequest {
            mode: args.output.unwrap_or(OutputMode::Console),
            mode_name: args.mode.name(),
            results_dir: &results_dir,
        };
        control_output(&table, &request, out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::test_support::{capture_logs, FakeSession};
    use std::error::Error;

    const SIDEBAR: &str = r#"<html><body><div class="sphinxsidebarwrapper"><ul>
<li><a href="https://docs.python.org/3.13/">Python 3.13 (stable)</a></li>
<li><a href="https://www.python.org/doc/versions/">All versions</a></li>
</ul></div></body></html>"#;

    struct Outcome {
        result: Result<(), CliRunError>,
        stdout: String,
        logs: String,
    }

    fn run_with(argv: &[&str], session: &mut FakeSession) -> Result<Outcome, Box<dyn Error>> {
        let args = Args::try_parse_from(argv)?;
        let dir = tempfile::tempdir()?;
        let paths = Paths::new(dir.path());
        let config = Config::default();
        let mut out = Vec::new();
        let (result, logs) = capture_logs(|| {
            logged_run(&args, || execute(&args, &config, &paths, session, &mut out))
        });
        Ok(Outcome {
            result,
            stdout: String::from_utf8(out)?,
            logs,
        })
    }

    #[test]
    fn parse_mode_all() {
        assert_eq!(parse_mode("whats-new").unwrap(), Mode::WhatsNew);
        assert_eq!(parse_mode("latest-versions").unwrap(), Mode::LatestVersions);
        assert_eq!(parse_mode("download").unwrap(), Mode::Download);
        assert_eq!(parse_mode("pep").unwrap(), Mode::Pep);
        assert_eq!(parse_mode("PEP").unwrap(), Mode::Pep);
    }

    #[test]
    fn parse_mode_invalid() {
        assert!(parse_mode("whatsnew").is_err());
        assert!(parse_mode("").is_err());
    }

    #[test]
    fn parse_output_all() {
        assert_eq!(parse_output("pretty").unwrap(), OutputMode::Pretty);
        assert_eq!(parse_output("file").unwrap(), OutputMode::File);
        assert_eq!(parse_output("FILE").unwrap(), OutputMode::File);
        assert!(parse_output("console").is_err());
    }

    #[test]
    fn args_parse_flags() {
        let args = Args::try_parse_from(["pydoc-scrape", "pep", "-c", "-o", "pretty"]).unwrap();
        assert_eq!(args.mode, Mode::Pep);
        assert!(args.clear_cache);
        assert_eq!(args.output, Some(OutputMode::Pretty));

        let args = Args::try_parse_from(["pydoc-scrape", "latest-versions"]).unwrap();
        assert_eq!(args.mode, Mode::LatestVersions);
        assert!(!args.clear_cache);
        assert_eq!(args.output, None);

        let args =
            Args::try_parse_from(["pydoc-scrape", "download", "--clear-cache", "--output", "file"])
                .unwrap();
        assert!(args.clear_cache);
        assert_eq!(args.output, Some(OutputMode::File));
    }

    #[test]
    fn args_reject_unknown_mode_and_missing_mode() {
        assert!(Args::try_parse_from(["pydoc-scrape", "nope"]).is_err());
        assert!(Args::try_parse_from(["pydoc-scrape"]).is_err());
        assert!(Args::try_parse_from(["pydoc-scrape", "pep", "-o", "json"]).is_err());
    }

    #[test]
    fn base_dir_flag_overrides_config() -> Result<(), CliRunError> {
        let args = Args::try_parse_from(["pydoc-scrape", "pep", "--base-dir", "/from/flag"]).unwrap();
        let config = Config {
            base_dir: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };
        assert_eq!(resolve_base_dir(&args, &config)?, PathBuf::from("/from/flag"));

        let args = Args::try_parse_from(["pydoc-scrape", "pep"]).unwrap();
        assert_eq!(resolve_base_dir(&args, &config)?, PathBuf::from("/from/config"));
        Ok(())
    }

    #[test]
    fn cli_run_error_exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliRunError::Scraper(ScraperError::ElementNotFound {
                message: "x".into()
            })
            .exit_code(),
            2
        );
        assert_eq!(
            CliRunError::Output(OutputError::Write(std::io::Error::new(
                std::io::ErrorKind::Other,
                "x"
            )))
            .exit_code(),
            3
        );
    }

    #[test]
    fn run_logs_start_arguments_and_finish() -> Result<(), Box<dyn Error>> {
        let mut session = FakeSession::default().with_page(MAIN_DOC_URL, SIDEBAR);
        let outcome = run_with(&["pydoc-scrape", "latest-versions", "-q"], &mut session)?;
        assert!(outcome.result.is_ok());
        assert!(outcome.logs.contains("parser started"));
        assert!(outcome.logs.contains("command-line arguments"));
        assert!(outcome.logs.contains("LatestVersions"));
        assert!(outcome.logs.contains("parser finished"));
        Ok(())
    }

    #[test]
    fn console_output_reaches_stdout() -> Result<(), Box<dyn Error>> {
        let mut session = FakeSession::default().with_page(MAIN_DOC_URL, SIDEBAR);
        let outcome = run_with(&["pydoc-scrape", "latest-versions", "-q"], &mut session)?;
        let lines: Vec<&str> = outcome.stdout.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Ссылка на статью Заголовок Редактор, автор");
        assert_eq!(lines[1], "https://docs.python.org/3.13/ 3.13 stable");
        Ok(())
    }

    #[test]
    fn pretty_output_reaches_stdout() -> Result<(), Box<dyn Error>> {
        let mut session = FakeSession::default().with_page(MAIN_DOC_URL, SIDEBAR);
        let outcome = run_with(
            &["pydoc-scrape", "latest-versions", "-q", "-o", "pretty"],
            &mut session,
        )?;
        assert!(outcome.result.is_ok());
        let stdout = &outcome.stdout;
        assert_eq!(stdout.lines().filter(|l| l.starts_with('+')).count(), 3);
        assert!(stdout.contains("| https://docs.python.org/3.13/ "));
        Ok(())
    }

    #[test]
    fn clear_cache_flag_clears_before_extracting() -> Result<(), Box<dyn Error>> {
        let mut session = FakeSession::default().with_page(MAIN_DOC_URL, SIDEBAR);
        let outcome = run_with(&["pydoc-scrape", "latest-versions", "-q", "-c"], &mut session)?;
        assert!(outcome.result.is_ok());
        assert_eq!(session.cache_clears(), 1);
        assert!(outcome.logs.contains("HTTP cache cleared"));
        assert_eq!(session.requests(), &[MAIN_DOC_URL.to_string()]);

        let mut session = FakeSession::default().with_page(MAIN_DOC_URL, SIDEBAR);
        run_with(&["pydoc-scrape", "latest-versions", "-q"], &mut session)?;
        assert_eq!(session.cache_clears(), 0);
        Ok(())
    }

    #[test]
    fn failed_run_logs_failure_and_maps_exit_code() -> Result<(), Box<dyn Error>> {
        let mut session = FakeSession::default();
        let outcome = run_with(&["pydoc-scrape", "pep", "-q"], &mut session)?;
        let code = outcome.result.as_ref().err().map(CliRunError::exit_code);
        assert_eq!(code, Some(2));
        assert!(outcome.logs.contains("parser started"));
        assert!(outcome.logs.contains("parser failed"));
        assert!(!outcome.logs.contains("parser finished"));
        assert!(outcome.stdout.is_empty());
        Ok(())
    }
}
