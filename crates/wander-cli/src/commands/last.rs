use chrono::{Local, Utc};
use wander_core::{Database, Journey};

pub fn run(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let Some(record) = db.last_journey()? else {
        return Err("no journey recorded yet".into());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let journey = Journey::try_from(record)?;
    let timing = journey.timing_at(Utc::now());
    println!("Started:   {}", journey.start_time().with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"));
    println!("Duration:  {} min", journey.total_duration_secs() / 60);
    println!("Buffer:    {} min", journey.buffer_secs() / 60);
    println!("Return to: {}", journey.return_location());
    println!("Deadline:  {}", journey.deadline().with_timezone(&Local).format("%H:%M:%S"));
    if timing.remaining_without_buffer_secs <= 0 {
        println!("Status:    deadline passed");
    } else {
        println!("Status:    {} min left", timing.remaining_without_buffer_secs / 60);
    }
    Ok(())
}
