//! `start` and `resume`: run a live session in the terminal.
//!
//! Positions come from stdin, one per line: `lat,lon`, or `allow` / `deny` to
//! toggle location authorization. A status line is printed whenever it changes.

use chrono::Utc;
use clap::Args;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use wander_core::{
    routing, Collaborators, Config, Coordinate, Database, Journey, LocationUpdate, Session,
    SessionConfig, Snapshot, SystemClock,
};

use crate::notifier::TerminalNotifier;

const LOCATION_CAPACITY: usize = 32;

#[derive(Args)]
pub struct RunOptions {
    /// End the session when stdin is closed
    #[arg(long)]
    exit_on_eof: bool,
    /// Print snapshots as JSON lines
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
pub struct StartArgs {
    /// Total journey length in minutes (defaults to journey.default_duration_min)
    #[arg(long)]
    minutes: Option<u32>,
    /// Safety buffer in minutes (defaults to journey.default_buffer_min)
    #[arg(long)]
    buffer_minutes: Option<u32>,
    /// Latitude of the return location
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude of the return location
    #[arg(long, allow_negative_numbers = true)]
    lon: f64,
    #[command(flatten)]
    run: RunOptions,
}

#[derive(Args)]
pub struct ResumeArgs {
    #[command(flatten)]
    run: RunOptions,
}

pub fn run_start(args: StartArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let minutes = args.minutes.unwrap_or(config.journey.default_duration_min);
    let buffer = args.buffer_minutes.unwrap_or(config.journey.default_buffer_min);

    let journey = Journey::new(
        i64::from(minutes) * 60,
        i64::from(buffer) * 60,
        Coordinate::new(args.lat, args.lon)?,
        Utc::now(),
    )?;

    let db = Database::open()?;
    db.save_last_journey(&journey.to_record())?;
    println!("Journey started: {minutes} min, {buffer} min buffer, return to {}", journey.return_location());

    run_session(journey, &config, &args.run)
}

pub fn run_resume(args: ResumeArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let Some(record) = db.last_journey()? else {
        return Err("no journey to resume".into());
    };
    let journey = Journey::try_from(record)?;
    println!("Journey resumed: started {}", journey.start_time().format("%H:%M:%S UTC"));

    run_session(journey, &config, &args.run)
}

fn run_session(
    journey: Journey,
    config: &Config,
    opts: &RunOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(drive(
        journey,
        config,
        opts,
        tokio::io::stdin(),
        tokio::signal::ctrl_c(),
    ));
    // Blocking stdin reads would otherwise hold up shutdown.
    runtime.shutdown_background();
    result
}

/// Run the session until `shutdown` resolves, the session stops publishing,
/// or (with `--exit-on-eof`) `input` is exhausted.
async fn drive<R, S>(
    journey: Journey,
    config: &Config,
    opts: &RunOptions,
    input: R,
    shutdown: S,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: AsyncRead + Unpin + Send + 'static,
    S: Future,
{
    let router = routing::from_config(&config.routing)?;
    tracing::info!(router = router.name(), "routing provider selected");

    let notifier = Arc::new(TerminalNotifier::new(tokio::runtime::Handle::current()));
    let (tx, rx) = mpsc::channel(LOCATION_CAPACITY);
    let session = Session::start(
        journey,
        Collaborators {
            router,
            notifier: notifier.clone(),
            clock: Arc::new(SystemClock),
        },
        SessionConfig::from_config(config),
        rx,
    );

    let mut snapshots = session.watch();
    let mut reader = tokio::spawn(read_locations(input, tx));
    let mut reader_done = false;
    let mut last_line = String::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(snapshot) = snapshot {
                    print_status(&snapshot, opts.json, &mut last_line)?;
                }
            }
            _ = &mut reader, if !reader_done => {
                reader_done = true;
                if opts.exit_on_eof {
                    break;
                }
            }
            _ = &mut shutdown => break,
        }
    }

    if !reader_done {
        reader.abort();
    }

    let Some(machine) = session.end().await else {
        return Ok(());
    };
    let trace = machine.trace();
    println!(
        "Journey ended: {} after {} positions, {:.0} m walked, {} alert(s) shown",
        machine.phase(),
        trace.len(),
        trace.distance_m(),
        notifier.delivered()
    );
    Ok(())
}

fn print_status(
    snapshot: &Snapshot,
    json: bool,
    last_line: &mut String,
) -> Result<(), Box<dyn std::error::Error>> {
    let line = if json {
        serde_json::to_string(snapshot)?
    } else {
        status_line(snapshot)
    };
    // JSON lines carry a timestamp, so compare the human form for both.
    let key = status_line(snapshot);
    if key != *last_line {
        println!("{line}");
        *last_line = key;
    }
    Ok(())
}

fn status_line(snapshot: &Snapshot) -> String {
    let p = &snapshot.projection;
    let title = p.title_text.as_deref().unwrap_or(&p.remaining_text);
    format!(
        "[{}] {} | elapsed {} | remaining {} ({}) | eta {}",
        snapshot.phase, title, p.elapsed_text, p.remaining_text, p.clock_text, p.eta_text
    )
}

async fn read_locations<R>(input: R, tx: mpsc::Sender<LocationUpdate>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<LocationUpdate>() {
                    Ok(update) => {
                        if tx.send(update).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::warn!(line = %line.trim(), error = %e, "ignoring location line"),
                }
            }
            Ok(None) => {
                tracing::info!("location input closed");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to read location input");
                break;
            }
        }
    }
}
