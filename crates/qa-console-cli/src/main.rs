//! Terminal front end: submit a QA run and follow it to completion.
#![allow(clippy::print_stdout, clippy::print_stderr, clippy::exit)]

use std::io::Write;

use anyhow::Context;
use clap::Parser;
use qa_console_client::QaConsole;
use qa_console_core::{
    ConsoleSurface, Level, QaForm, RunId, SelectionMode, SubmissionAck, TerminologyMode,
    normalize_base_url, resolve_base_url,
};
use tracing::{debug, info, warn};

#[derive(Debug, Parser)]
#[command(name = "qa-console", about = "Follow a server-side QA execution from the terminal")]
struct Args {
    /// Base URL of the QA server; QA_CONSOLE_BASE_URL overrides the default.
    #[arg(long)]
    base_url: Option<String>,

    /// The run fails when an issue of this gravity is encountered.
    #[arg(long, value_parser = parse_level, default_value = "error")]
    fail_at: Level,

    /// Show messages from this level onwards.
    #[arg(long, value_parser = parse_level, default_value = "information")]
    verbosity_level: Level,

    /// File selection: all, changed or filtered.
    #[arg(long, value_parser = parse_mode, default_value = "all")]
    mode: SelectionMode,

    /// Comma-separated file-name filters (filtered mode only).
    #[arg(long)]
    filters: Option<String>,

    /// Disable the terminology server.
    #[arg(long)]
    no_tx: bool,

    /// Fetch the run's debug info once it completes.
    #[arg(long)]
    debug_info: bool,

    /// Preview which files the selected steps would touch, without running.
    #[arg(long)]
    list_files: bool,

    /// Names of the steps to execute.
    steps: Vec<String>,
}

fn parse_level(raw: &str) -> Result<Level, String> {
    Level::parse(raw).ok_or_else(|| format!("unknown level: {raw}"))
}

fn parse_mode(raw: &str) -> Result<SelectionMode, String> {
    SelectionMode::parse(raw).ok_or_else(|| format!("unknown selection mode: {raw}"))
}

/// Surface rendering streamed HTML fragments as plain terminal text.
#[derive(Debug, Default)]
struct TerminalSurface;

impl ConsoleSurface for TerminalSurface {
    fn set_busy(&mut self, busy: bool) {
        debug!(busy, "console state changed");
    }

    fn insert_run_pane(&mut self, id: &RunId) {
        println!("==== QA execution #{id} ====");
    }

    fn append_output(&mut self, _id: &RunId, html: &str) {
        print!("{}", strip_tags(html));
        let _ = std::io::stdout().flush();
    }

    fn append_summary(&mut self, text: &str, _class_attr: &str) {
        println!("\n==== Result: {text} ====");
    }

    fn replace_debug_region(&mut self, id: &RunId, html: &str) {
        println!("---- debug info for run {id} ----");
        println!("{}", strip_tags(html));
    }
}

/// Streamed fragments are trusted HTML on the original page; a terminal is
/// not an HTML sink, so tags are dropped and basic entities decoded.
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for character in html.chars() {
        match character {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(character),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn build_form(args: &Args) -> QaForm {
    let mut form = QaForm::default();
    form.mode = args.mode;
    form.filters = args
        .filters
        .as_deref()
        .map(|filters| filters.split(',').map(|f| f.trim().to_string()).collect())
        .unwrap_or_default();
    form.steps = args.steps.clone();
    form.set_verbosity(args.verbosity_level);
    form.set_fail_at(args.fail_at);
    if args.no_tx {
        form.terminology = TerminologyMode::Disabled;
    }
    form.debug = args.debug_info;
    form
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let base_url = match &args.base_url {
        Some(raw) => normalize_base_url(raw).context("invalid --base-url")?,
        None => {
            let (resolved, source) = resolve_base_url()?;
            debug!(base_url = %resolved, source, "resolved server location");
            resolved
        }
    };
    let form = build_form(&args);

    let mut console = QaConsole::new(&base_url, TerminalSurface)?;

    if args.list_files {
        let files = console.gateway().preview_files(&form).await?;
        for file in &files {
            println!("{file}");
        }
        info!(count = files.len(), "files matched by the current selection");
        return Ok(());
    }

    let ack = console.start(&form).await.context("submission failed")?;
    let run_id = match &ack {
        SubmissionAck::Run(id) => {
            info!(run = %id, "run accepted");
            Some(id.clone())
        }
        SubmissionAck::AlreadyRunning => {
            info!("a run is already active server-side; following its result");
            None
        }
        SubmissionAck::Idle => {
            info!("server reports nothing to do");
            return Ok(());
        }
    };

    let result = console.follow_to_completion().await;
    if let (true, Some(id)) = (args.debug_info, run_id) {
        if let Err(error) = console.load_debug(&id).await {
            warn!(%error, run = %id, "debug info unavailable");
        }
    }
    console.shutdown().await;

    match result.as_deref() {
        Some("success") => Ok(()),
        Some(other) => {
            warn!(result = other, "QA run did not succeed");
            std::process::exit(1);
        }
        None => {
            warn!("push channel closed before a result arrived; the run continues server-side");
            std::process::exit(1);
        }
    }
}
