use chrono::{Duration, Utc};
use clap::Args;
use wander_core::journey::Input;
use wander_core::{Config, Coordinate, EtaSample, Event, Journey, JourneyMachine};

#[derive(Args)]
pub struct CheckArgs {
    /// Total journey length in minutes (defaults to journey.default_duration_min)
    #[arg(long)]
    minutes: Option<u32>,
    /// Safety buffer in minutes (defaults to journey.default_buffer_min)
    #[arg(long)]
    buffer_minutes: Option<u32>,
    /// Seconds since the journey started
    #[arg(long)]
    elapsed_secs: i64,
    /// Expected walk home in seconds; omit to evaluate without an estimate
    #[arg(long)]
    eta_secs: Option<i64>,
    /// Print as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let minutes = args.minutes.unwrap_or(config.journey.default_duration_min);
    let buffer = args.buffer_minutes.unwrap_or(config.journey.default_buffer_min);

    let now = Utc::now();
    let start = Duration::try_seconds(args.elapsed_secs)
        .and_then(|elapsed| now.checked_sub_signed(elapsed))
        .ok_or_else(|| format!("--elapsed-secs out of range: {}", args.elapsed_secs))?;
    let journey = Journey::new(
        i64::from(minutes) * 60,
        i64::from(buffer) * 60,
        Coordinate::new(0.0, 0.0)?,
        start,
    )?;

    let mut machine = JourneyMachine::new(journey);
    let mut events = machine.handle(Input::Tick { now });
    if let Some(eta) = args.eta_secs {
        let sample = EtaSample {
            expected_travel_secs: eta,
            route: Vec::new(),
            sampled_at: now,
        };
        events.extend(machine.handle(Input::EtaSample { sample, now }));
    }
    let snapshot = machine.snapshot(now);

    if args.json {
        let out = serde_json::json!({
            "snapshot": snapshot,
            "events": events,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let projection = &snapshot.projection;
    println!("Phase:     {}", snapshot.phase);
    if let Some(title) = &projection.title_text {
        println!("Title:     {title}");
    }
    println!("Elapsed:   {}", projection.elapsed_text);
    println!("Remaining: {} ({})", projection.remaining_text, projection.clock_text);
    println!("ETA:       {}", projection.eta_text);
    println!("Color:     {}", projection.status_color.hex());
    for event in &events {
        if let Event::AlertRequested { remaining_text, .. } = event {
            println!("Alert:     You have {remaining_text}");
        }
    }
    Ok(())
}
