//! `config`: inspect and edit `config.toml` by dotted key.
//!
//! Keys are `<section>.<field>`:
//! - `journey.default_duration_min`, `journey.default_buffer_min`
//! - `engine.tick_interval_ms`, `engine.refresh_interval_secs`
//! - `routing.provider` (`straight_line` or `osrm`), `routing.osrm_base_url`,
//!   `routing.timeout_secs`, `routing.walking_speed_mps`, `routing.detour_factor`
//! - `notifications.enabled`, `notifications.immediate_delay_secs`,
//!   `notifications.reminder_period_secs`, `notifications.sound`

use clap::Subcommand;
use serde_json::Value;
use wander_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one value, e.g. `routing.provider`
    Get {
        /// Dotted key such as "engine.refresh_interval_secs"
        key: String,
    },
    /// Change one value; the whole file is validated before saving
    Set {
        /// Dotted key such as "journey.default_buffer_min"
        key: String,
        /// New value
        value: String,
    },
    /// Print every key with its current value
    List {
        /// Print the sections as a JSON object instead
        #[arg(long)]
        json: bool,
    },
    /// Overwrite config.toml with the defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("ok");
        }
        ConfigAction::List { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                for line in key_lines(&serde_json::to_value(&config)?) {
                    println!("{line}");
                }
            }
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults at {}", Config::path()?.display());
        }
    }
    Ok(())
}

/// Flatten the section tables into `section.field = value` lines, sorted by key.
fn key_lines(config: &Value) -> Vec<String> {
    let Value::Object(sections) = config else {
        return Vec::new();
    };
    let mut lines = Vec::new();
    for (section, fields) in sections {
        let Value::Object(fields) = fields else {
            continue;
        };
        for (field, value) in fields {
            let shown = match value {
                Value::String(s) => s.clone(),
                Value::Null => "(unset)".to_string(),
                other => other.to_string(),
            };
            lines.push(format!("{section}.{field} = {shown}"));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_lines_cover_every_section() {
        let value = serde_json::to_value(Config::default()).unwrap();
        let lines = key_lines(&value);

        assert!(lines.contains(&"journey.default_duration_min = 60".to_string()));
        assert!(lines.contains(&"engine.refresh_interval_secs = 15".to_string()));
        assert!(lines.contains(&"routing.provider = straight_line".to_string()));
        assert!(lines.contains(&"notifications.sound = DogBark.wav".to_string()));
        // Every listed key must be accepted by `config get`.
        let config = Config::default();
        for line in &lines {
            let key = line.split(" = ").next().unwrap();
            assert!(config.get(key).is_some(), "{key}");
        }
    }

    #[test]
    fn test_key_lines_mark_unset_values() {
        let mut config = Config::default();
        config.notifications.sound = None;
        let lines = key_lines(&serde_json::to_value(&config).unwrap());
        assert!(lines.contains(&"notifications.sound = (unset)".to_string()));
    }
}
