//! Command-line surface: hand-rolled argument parsing and command execution.
//!
//! Output is written through an injected `Write`, and the backend through the
//! `ApiClient` trait, so whole commands run under test against the mock
//! client with a `Vec<u8>` sink.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use xcodedash_client::service::ApiClient;
use xcodedash_client::types::{JobId, ModelChoice};

use xcodedash_client::http::HttpApiClient;

use crate::actions::{self, AddRepoForm};
use crate::config::{self, ConfigOverrides, DashConfig};
use crate::dashboard::frame_lines;
use crate::job_tracker::{track_job, JobOutcome};
use crate::notify::{NotificationSlot, Severity};
use crate::paint::LinePainter;
use crate::presenter::ResultRegions;
use crate::repo_store::RepositoryStore;
use crate::status::{run_status_poller, StatusView};

/// Parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Watch,
    Repos,
    Add { form: AddRepoForm },
    Sync,
    ClearContext,
    Analyze { error_text: String, force_sync: bool },
    Query { query: String },
    Job { id: String },
}

/// Full parse result: command plus global flags and config overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedArgs {
    pub command: Command,
    pub json: bool,
    pub model: ModelChoice,
    pub overrides: ConfigOverrides,
}

/// Parse command-line arguments (program name already stripped).
pub fn parse_args(args: &[String]) -> Result<ParsedArgs, String> {
    let mut json = false;
    let mut model = ModelChoice::Both;
    let mut force_sync = false;
    let mut overrides = ConfigOverrides::default();
    let mut form = AddRepoForm::default();
    let mut command_word: Option<String> = None;
    let mut positionals: Vec<String> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut take_value = |flag: &str| -> Result<String, String> {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match arg.as_str() {
            "--json" => json = true,
            "--force-sync" => force_sync = true,
            "--no-retry-transport" => overrides.retry_on_transport = Some(false),
            "--model" => {
                let value = take_value("--model")?;
                model = ModelChoice::from_flag(&value)
                    .ok_or_else(|| format!("--model: expected both|deepseek|gemini, got {value:?}"))?;
            }
            "--base-url" => overrides.base_url = Some(take_value("--base-url")?),
            "--timeout-secs" => {
                overrides.timeout_secs = Some(parse_number("--timeout-secs", &take_value("--timeout-secs")?)?);
            }
            "--interval-secs" => {
                overrides.job_poll_secs = Some(parse_number("--interval-secs", &take_value("--interval-secs")?)?);
            }
            "--status-poll-secs" => {
                overrides.status_poll_secs =
                    Some(parse_number("--status-poll-secs", &take_value("--status-poll-secs")?)?);
            }
            "--max-attempts" => {
                let value = take_value("--max-attempts")?;
                let attempts: u32 = value
                    .trim()
                    .parse()
                    .map_err(|_| format!("--max-attempts: expected a number, got {value:?}"))?;
                overrides.max_attempts = Some(attempts);
            }
            "--name" => form.name = take_value("--name")?,
            "--url" => form.url = take_value("--url")?,
            "--branch" => form.branch = take_value("--branch")?,
            "--token" => form.access_token = Some(take_value("--token")?),
            "--sync-interval" => {
                form.sync_interval = Some(parse_number("--sync-interval", &take_value("--sync-interval")?)?);
            }
            "--help" | "-h" => command_word = Some("help".to_owned()),
            other if other.starts_with("--") => {
                return Err(format!("unknown flag {other:?}"));
            }
            other => {
                if command_word.is_none() {
                    command_word = Some(other.to_owned());
                } else {
                    positionals.push(other.to_owned());
                }
            }
        }
    }

    let command = match command_word.as_deref() {
        None | Some("help") => Command::Help,
        Some("status") => Command::Status,
        Some("watch") => Command::Watch,
        Some("repos") => Command::Repos,
        Some("add") => Command::Add { form },
        Some("sync") => Command::Sync,
        Some("clear-context") => Command::ClearContext,
        Some("analyze") => Command::Analyze {
            error_text: positionals.join(" "),
            force_sync,
        },
        Some("query") => Command::Query {
            query: positionals.join(" "),
        },
        Some("job") => {
            let id = positionals
                .first()
                .cloned()
                .ok_or_else(|| "job requires an id".to_owned())?;
            Command::Job { id }
        }
        Some(other) => return Err(format!("unknown command {other:?}")),
    };

    Ok(ParsedArgs {
        command,
        json,
        model,
        overrides,
    })
}

fn parse_number(flag: &str, value: &str) -> Result<u64, String> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("{flag}: expected a number, got {value:?}"))
}

/// Usage text for `help` and parse failures.
#[must_use]
pub fn usage() -> String {
    [
        "xcodedash — terminal dashboard for the Xcode AI assistant backend",
        "",
        "USAGE:",
        "  xcodedash <command> [flags]",
        "",
        "COMMANDS:",
        "  status            Show the current server health summary",
        "  watch             Live dashboard; repaints on the health poll period",
        "  repos             List repositories with aggregate stats",
        "  add               Add a repository (--name, --url [--branch --token --sync-interval])",
        "  sync              Trigger a backend-wide repository sync",
        "  clear-context     Drop the assistant's accumulated file context",
        "  analyze <text>    Analyze a build error and track the job to completion",
        "  query <text>      Ask a general coding question and track the job",
        "  job <id>          Attach to an existing job by id",
        "  help              Show this help",
        "",
        "FLAGS:",
        "  --json                        Print raw JSON results",
        "  --model both|deepseek|gemini  Model selection for analyze/query (default: both)",
        "  --force-sync                  Force a repository sync before analysis",
        "  --base-url <url>              Backend origin (default: http://127.0.0.1:8000)",
        "  --timeout-secs <n>            Per-request timeout (default: 30)",
        "  --interval-secs <n>           Job poll interval (default: 2)",
        "  --status-poll-secs <n>        Health poll period (default: 15)",
        "  --max-attempts <n>            Stop tracking after n polls (default: unbounded)",
        "  --no-retry-transport          Treat network failures while polling as fatal",
    ]
    .join("\n")
}

/// Execute a parsed command against a client. Returns the process exit code.
pub async fn execute<C: ApiClient + ?Sized + 'static>(
    client: Arc<C>,
    parsed: &ParsedArgs,
    config: &DashConfig,
    cancel: CancellationToken,
    out: &mut dyn Write,
) -> i32 {
    match &parsed.command {
        Command::Help => {
            let _ = writeln!(out, "{}", usage());
            0
        }
        Command::Status => run_status(client.as_ref(), parsed.json, out).await,
        Command::Repos => run_repos(client.as_ref(), parsed.json, out).await,
        Command::Add { form } => run_add(client.as_ref(), form, out).await,
        Command::Sync => {
            let mut slot = NotificationSlot::new();
            let report = actions::trigger_sync(client.as_ref(), &mut slot).await;
            print_notice(out, &report.notice);
            exit_code(&report.notice)
        }
        Command::ClearContext => {
            let mut slot = NotificationSlot::new();
            let report = actions::clear_context(client.as_ref(), &mut slot).await;
            print_notice(out, &report.notice);
            exit_code(&report.notice)
        }
        Command::Analyze {
            error_text,
            force_sync,
        } => {
            let mut slot = NotificationSlot::new();
            let report = actions::analyze_error(
                client.as_ref(),
                error_text,
                parsed.model,
                *force_sync,
                &mut slot,
            )
            .await;
            print_notice(out, &report.notice);
            match &report.started_job {
                Some(job_id) => {
                    run_tracked_job(client.as_ref(), job_id, config, &cancel, parsed.json, out)
                        .await
                }
                None => exit_code(&report.notice),
            }
        }
        Command::Query { query } => {
            let mut slot = NotificationSlot::new();
            let report =
                actions::submit_query(client.as_ref(), query, parsed.model, &mut slot).await;
            print_notice(out, &report.notice);
            match &report.started_job {
                Some(job_id) => {
                    run_tracked_job(client.as_ref(), job_id, config, &cancel, parsed.json, out)
                        .await
                }
                None => exit_code(&report.notice),
            }
        }
        Command::Job { id } => {
            let job_id = JobId(id.clone());
            run_tracked_job(client.as_ref(), &job_id, config, &cancel, parsed.json, out).await
        }
        Command::Watch => run_watch(client, config, cancel, out).await,
    }
}

async fn run_status<C: ApiClient + ?Sized>(client: &C, json: bool, out: &mut dyn Write) -> i32 {
    match client.server_status().await {
        Ok(status) => {
            let mut view = StatusView::new();
            view.apply(&status, Utc::now());
            if json {
                let value = serde_json::json!({
                    "connection": view.connection.as_str(),
                    "repositories": view.repositories,
                    "total_files": view.total_files,
                    "context_files": view.context_files,
                    "critical_files": view.critical_files,
                    "last_sync": view.last_sync_label,
                });
                let _ = writeln!(out, "{value}");
            } else {
                let _ = writeln!(out, "{}", view.strip_line());
            }
            0
        }
        Err(err) => {
            tracing::warn!(error = %err, "status fetch failed");
            let mut view = StatusView::new();
            view.mark_offline();
            let _ = writeln!(out, "{}", view.strip_line());
            1
        }
    }
}

async fn run_repos<C: ApiClient + ?Sized>(client: &C, json: bool, out: &mut dyn Write) -> i32 {
    let mut store = RepositoryStore::new();
    match client.list_repositories().await {
        Ok(repos) => {
            store.replace(repos);
            if json {
                let rendered = serde_json::to_string_pretty(store.repositories())
                    .unwrap_or_else(|_| "[]".to_owned());
                let _ = writeln!(out, "{rendered}");
            } else {
                for line in store.panel_lines() {
                    let _ = writeln!(out, "{line}");
                }
            }
            0
        }
        Err(err) => {
            tracing::warn!(error = %err, "repository list failed");
            let _ = writeln!(out, "✖ Failed to load repositories");
            1
        }
    }
}

async fn run_add<C: ApiClient + ?Sized>(
    client: &C,
    form: &AddRepoForm,
    out: &mut dyn Write,
) -> i32 {
    let mut slot = NotificationSlot::new();
    let report = actions::add_repository(client, form, &mut slot).await;
    print_notice(out, &report.notice);
    if report.reload_repositories {
        if let Ok(repos) = client.list_repositories().await {
            let mut store = RepositoryStore::new();
            store.replace(repos);
            for line in store.panel_lines() {
                let _ = writeln!(out, "{line}");
            }
        }
    }
    exit_code(&report.notice)
}

async fn run_tracked_job<C: ApiClient + ?Sized>(
    client: &C,
    job_id: &JobId,
    config: &DashConfig,
    cancel: &CancellationToken,
    json: bool,
    out: &mut dyn Write,
) -> i32 {
    let poll_config = config.job_poll_config();
    let _ = writeln!(
        out,
        "tracking job {job_id} (poll every {}s)",
        poll_config.poll_interval.as_secs()
    );
    match track_job(client, job_id, &poll_config, cancel).await {
        Ok(JobOutcome::Completed(result)) => {
            if json {
                let _ = writeln!(out, "{}", result.raw_pretty());
            } else {
                let mut regions = ResultRegions::new();
                regions.apply_result(&result);
                for line in regions.render_lines() {
                    let _ = writeln!(out, "{line}");
                }
            }
            let _ = writeln!(out, "✔ Job completed");
            0
        }
        Ok(JobOutcome::Failed { message }) => {
            let detail = message.unwrap_or_else(|| "no detail reported".to_owned());
            let _ = writeln!(out, "✖ Job failed: {detail}");
            1
        }
        Ok(JobOutcome::TimedOut { attempts }) => {
            let _ = writeln!(out, "✖ Job still not terminal after {attempts} polls; gave up");
            1
        }
        Ok(JobOutcome::Cancelled) => {
            let _ = writeln!(out, "· Job tracking cancelled");
            1
        }
        Err(err) => {
            tracing::warn!(error = %err, "job tracking failed");
            let _ = writeln!(out, "✖ {err}");
            1
        }
    }
}

async fn run_watch<C: ApiClient + ?Sized + 'static>(
    client: Arc<C>,
    config: &DashConfig,
    cancel: CancellationToken,
    out: &mut dyn Write,
) -> i32 {
    let status_view = Arc::new(Mutex::new(StatusView::new()));
    let poller = tokio::spawn(run_status_poller(
        Arc::clone(&client),
        Arc::clone(&status_view),
        config.status_poll_period,
        cancel.clone(),
    ));

    let mut store = RepositoryStore::new();
    let mut slot = NotificationSlot::new();
    let mut painter = LinePainter::new();
    let _ = painter.reset(&mut *out);
    let refresh_secs = config.status_poll_period.as_secs();
    let mut next_repo_refresh = tokio::time::Instant::now();

    loop {
        if tokio::time::Instant::now() >= next_repo_refresh {
            match client.list_repositories().await {
                Ok(repos) => store.replace(repos),
                Err(err) => {
                    tracing::warn!(error = %err, "repository refresh failed");
                    slot.show(Severity::Error, "Failed to refresh repositories", Utc::now());
                }
            }
            next_repo_refresh = tokio::time::Instant::now() + config.status_poll_period;
        }

        let now = Utc::now();
        slot.tick(now);
        let status = status_view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let lines = frame_lines(&status, &store, &slot, now, refresh_secs);
        let _ = painter.repaint(&mut *out, &lines);

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(Duration::from_secs(1)) => {}
        }
    }

    let _ = poller.await;
    0
}

/// Full binary entry point: parse arguments, resolve configuration from the
/// process environment, run the command over HTTP.
///
/// Exit codes: 0 success, 1 the backend reported or suffered a failure, 2 the
/// invocation itself was invalid.
pub fn run_from_env(args: &[String], out: &mut dyn Write, err_out: &mut dyn Write) -> i32 {
    let parsed = match parse_args(args) {
        Ok(parsed) => parsed,
        Err(message) => {
            let _ = writeln!(err_out, "error: {message}");
            let _ = writeln!(err_out, "{}", usage());
            return 2;
        }
    };

    let env = |key: &str| std::env::var(key).ok();
    let file_contents =
        env(config::ENV_CONFIG_PATH).and_then(|path| std::fs::read_to_string(path).ok());
    let resolved = match config::load_config(&env, file_contents.as_deref(), &parsed.overrides) {
        Ok(resolved) => resolved,
        Err(message) => {
            let _ = writeln!(err_out, "error: {message}");
            return 2;
        }
    };

    let client = match HttpApiClient::new(&resolved.base_url, resolved.request_timeout) {
        Ok(client) => Arc::new(client),
        Err(err) => {
            let _ = writeln!(err_out, "error: {err}");
            return 2;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            let _ = writeln!(err_out, "error: failed to start async runtime: {err}");
            return 2;
        }
    };

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });
        execute(client, &parsed, &resolved, cancel, out).await
    })
}

fn print_notice(out: &mut dyn Write, notice: &actions::Notice) {
    let _ = writeln!(out, "{} {}", notice.severity.glyph(), notice.message);
}

fn exit_code(notice: &actions::Notice) -> i32 {
    i32::from(notice.severity == Severity::Error)
}
