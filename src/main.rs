//! Job-feed signals CLI
//!
//! Hosts a page session in the terminal: dwell time and preference signals
//! are reported to the configured job board exactly as a page would.

use anyhow::{bail, Context};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use jobfeed_signals::{
    config::Config,
    core::{Dispatched, FlushOutcome, ManualClock, PageSession, PreferenceSink},
    page::{ControlAction, PageContext, PageEvent, PageEventBus, PreferenceControl, TrackedItem},
    transparency::{create_shared_log_with_persistence, SharedSignalLog},
    Capabilities, ConsoleSurface, Delivery, SessionBuilder, TRACKING_DECLARATION, VERSION,
};
use serde::Deserialize;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "jobfeed-signals")]
#[command(version = VERSION)]
#[command(about = "Dwell-time and preference signals for job listings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a job page and report signals from terminal input
    Watch {
        #[command(flatten)]
        page: PageArgs,
    },

    /// Replay a recorded page transcript (JSON lines) against the backend
    Replay {
        /// Transcript file of `{"at_ms": .., "event": ..}` lines
        file: PathBuf,

        #[command(flatten)]
        page: PageArgs,
    },

    /// Show reporting statistics
    Status {
        /// Clear all counters
        #[arg(long)]
        reset: bool,
    },

    /// Display the tracking declaration
    Declaration,

    /// Show configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

#[derive(Args)]
struct PageArgs {
    /// Id of the job the page is about; omit to disable dwell tracking
    #[arg(long)]
    job_id: Option<String>,

    /// Page URL (defaults to `<base_url>/jobs/<job_id>/`)
    #[arg(long)]
    url: Option<String>,

    /// Raw cookie header of the page, e.g. `csrftoken=...`
    #[arg(long, default_value = "")]
    cookie: String,

    /// Pretend the host has no beacon support
    #[arg(long)]
    no_beacon: bool,
}

/// One line of a replay transcript.
#[derive(Debug, Deserialize)]
struct TranscriptEntry {
    /// Milliseconds since page load
    at_ms: u64,
    event: PageEvent,
}

/// A parsed line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Event(PageEvent),
    Quit,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Watch { page } => cmd_watch(&page),
        Commands::Replay { file, page } => cmd_replay(&file, &page),
        Commands::Status { reset } => cmd_status(reset),
        Commands::Declaration => {
            println!("{TRACKING_DECLARATION}");
            Ok(())
        }
        Commands::Config { init } => cmd_config(init),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_watch(args: &PageArgs) -> anyhow::Result<()> {
    let config = load_config();
    let signal_log = create_shared_log_with_persistence(config.signal_log_path());
    let runtime = build_runtime()?;

    let context = page_context(args, &config)?;
    println!("Job Feed Signals v{VERSION}");
    println!("  Page: {}", context.url());

    let (mut session, delivery) = SessionBuilder::new(context, config.clone())
        .capabilities(Capabilities::new(config.prefer_beacon && !args.no_beacon))
        .signal_log(signal_log.clone())
        .build(Arc::new(ConsoleSurface), runtime.handle().clone())?;
    println!("  View delivery: {}", delivery.strategy());

    let bus = PageEventBus::default();

    // Ctrl+C tears the page down.
    let unload = bus.clone();
    ctrlc::set_handler(move || {
        unload.publish(PageEvent::Unload);
    })
    .context("Failed to install Ctrl+C handler")?;

    let input = bus.sender();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_input(&line) {
                Some(Input::Event(event)) => {
                    if input.send(event).is_err() {
                        return;
                    }
                }
                Some(Input::Quit) => break,
                None => eprintln!(
                    "Unknown input '{}'. Use: hide, show, save <id>, reject <id>, ignore <id>, quit",
                    line.trim()
                ),
            }
        }
        let _ = input.send(PageEvent::Unload);
    });

    start_session(&mut session);
    println!();
    println!("Commands: hide, show, save <id>, reject <id>, ignore <id>, quit (Ctrl+C)");
    println!();

    for event in bus.receiver().iter() {
        let unload = event == PageEvent::Unload;
        let dispatched = {
            let _entered = runtime.enter();
            session.dispatch(event)
        };
        describe(&dispatched);
        if unload {
            break;
        }
    }

    finish(runtime, session, delivery, &signal_log, &config)
}

fn cmd_replay(file: &Path, args: &PageArgs) -> anyhow::Result<()> {
    let config = load_config();
    let signal_log = create_shared_log_with_persistence(config.signal_log_path());
    let runtime = build_runtime()?;

    let transcript = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read transcript {}", file.display()))?;
    let entries = transcript
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            let entry = serde_json::from_str::<TranscriptEntry>(line)
                .with_context(|| format!("Invalid transcript line {}", n + 1))?;
            Ok((n + 1, entry))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let loaded_at = Utc::now();
    let clock = Arc::new(ManualClock::new(loaded_at));

    let context = page_context(args, &config)?;
    let (mut session, delivery) = SessionBuilder::new(context, config.clone())
        .capabilities(Capabilities::new(config.prefer_beacon && !args.no_beacon))
        .clock(clock.clone())
        .signal_log(signal_log.clone())
        .build(Arc::new(ConsoleSurface), runtime.handle().clone())?;

    println!(
        "Replaying {} events from {} via {}",
        entries.len(),
        file.display(),
        delivery.strategy()
    );
    start_session(&mut session);

    for (line, entry) in entries {
        let at = replay_instant(loaded_at, entry.at_ms).with_context(|| {
            format!("Transcript line {line}: at_ms {} is out of range", entry.at_ms)
        })?;
        clock.set(at);
        print!("[{:>8} ms] ", entry.at_ms);
        let dispatched = {
            let _entered = runtime.enter();
            session.dispatch(entry.event)
        };
        describe(&dispatched);
    }

    finish(runtime, session, delivery, &signal_log, &config)
}

fn cmd_status(reset: bool) -> anyhow::Result<()> {
    let config = load_config();
    let signal_log = create_shared_log_with_persistence(config.signal_log_path());

    if reset {
        signal_log.reset();
        signal_log
            .save()
            .context("Failed to save signal statistics")?;
        println!("Signal statistics cleared.");
        return Ok(());
    }

    println!("Job Feed Signals v{VERSION}");
    println!();
    println!("{}", signal_log.summary());
    Ok(())
}

fn cmd_config(init: bool) -> anyhow::Result<()> {
    let config = load_config();

    if init {
        config.save().context("Failed to write configuration")?;
        println!("Wrote {}", Config::config_path().display());
        return Ok(());
    }

    println!("Configuration file: {}", Config::config_path().display());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to render configuration")?
    );
    Ok(())
}

fn load_config() -> Config {
    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load configuration, using defaults: {e}");
        Config::default()
    });
    if let Err(e) = config.ensure_directories() {
        tracing::warn!("Could not create data directory: {e}");
    }
    config
}

fn build_runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn page_context(args: &PageArgs, config: &Config) -> anyhow::Result<PageContext> {
    let tracked_item = TrackedItem::from_attribute(args.job_id.as_deref());

    let url = match (&args.url, &tracked_item) {
        (Some(url), _) => url.clone(),
        (None, Some(item)) => format!("{}/jobs/{item}/", config.base_url.trim_end_matches('/')),
        (None, None) => bail!("Either --job-id or --url is required"),
    };

    Ok(PageContext::new(&url, args.cookie.as_str(), tracked_item)?)
}

/// Clock reading for a transcript offset, or `None` when it cannot be represented.
fn replay_instant(loaded_at: DateTime<Utc>, at_ms: u64) -> Option<DateTime<Utc>> {
    let offset = TimeDelta::try_milliseconds(i64::try_from(at_ms).ok()?)?;
    loaded_at.checked_add_signed(offset)
}

fn start_session<S: PreferenceSink>(session: &mut PageSession<S>) {
    if session.start() {
        println!("  Dwell tracking: armed");
    } else {
        println!("  Dwell tracking: disabled (no job id on page)");
    }
}

/// Wait for outstanding reports and deliveries, then persist stats.
fn finish<S: PreferenceSink>(
    runtime: tokio::runtime::Runtime,
    mut session: PageSession<S>,
    delivery: Arc<dyn Delivery>,
    signal_log: &SharedSignalLog,
    config: &Config,
) -> anyhow::Result<()> {
    runtime.block_on(session.settle());
    delivery.shutdown();
    runtime.shutdown_timeout(config.feedback.toast_exit_animation);

    signal_log
        .save()
        .context("Failed to save signal statistics")?;
    Ok(())
}

fn describe(dispatched: &Dispatched) {
    match dispatched {
        Dispatched::Flushed(FlushOutcome::Sent { event, outcome }) => println!(
            "view {} for {}s from '{}': {:?}",
            event.job_id, event.time_spent_seconds, event.source, outcome
        ),
        Dispatched::Flushed(FlushOutcome::Discarded { dwell_seconds }) => {
            println!("visit of {dwell_seconds}s too short, not reported")
        }
        Dispatched::Flushed(FlushOutcome::Inactive) => println!("dwell tracking inactive"),
        Dispatched::Rearmed => println!("page visible, dwell clock restarted"),
        Dispatched::Ignored => println!("page visible, dwell tracking inactive"),
        Dispatched::Reporting => println!("preference sent"),
    }
}

fn parse_input(line: &str) -> Option<Input> {
    let mut words = line.split_whitespace();
    let command = words.next()?;
    let argument = words.next();

    let control = |action: ControlAction| {
        argument.map(|id| Input::Event(PageEvent::Control(PreferenceControl::new(action, id))))
    };

    match command {
        "hide" | "hidden" => Some(Input::Event(PageEvent::hidden())),
        "show" | "visible" => Some(Input::Event(PageEvent::visible())),
        "unload" => Some(Input::Event(PageEvent::Unload)),
        "quit" | "exit" => Some(Input::Quit),
        "save" => control(ControlAction::Save),
        "reject" => control(ControlAction::Reject),
        "ignore" => control(ControlAction::Ignore),
        marker => ControlAction::from_marker(marker).and_then(control),
    }
}
