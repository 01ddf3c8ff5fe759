// packages/interpose/src/main.rs
//! Interpose fixture tool
//!
//! Lists, inspects and exports the capture records tests replay.
//!
//! ```text
//! interpose list              fixtures in the configured directory
//! interpose inspect <name>    one fixture's status, headers and timings
//! interpose har               all fixtures as an HTTP Archive
//! interpose bindings          the default binding table
//! ```

use anyhow::{bail, Context, Result};
use interpose::interception::Registry;
use interpose::observability::init_tracing;
use interpose::recording::{ExportFormat, Exporter, FixtureStore};
use interpose::utils::config::MockConfig;
use tracing::info;

fn main() -> Result<()> {
    let config = MockConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    info!("interpose v{} ({})", interpose::VERSION, interpose::GIT_HASH);

    let store = FixtureStore::from_settings(&config.fixtures);
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        [] | ["list"] => {
            let records = store.load_all()?;
            if records.is_empty() {
                println!("No fixtures in {}", store.base_dir().display());
            }
            for (name, record) in records {
                println!(
                    "{:<32} {} {} ({} bytes)",
                    name,
                    record.status_code,
                    record.url,
                    record.content.len()
                );
            }
        }
        ["inspect", name] => {
            let record = store
                .load(name)
                .with_context(|| format!("Failed to load fixture '{}'", name))?;

            println!("url:         {}", record.url);
            println!("status:      {}", record.status_code);
            if let Some(at) = record.recorded_at {
                println!("recorded at: {}", at.to_rfc3339());
            }
            println!("headers:");
            for (key, value) in record.header_lines() {
                println!("  {}: {}", key, value);
            }
            println!("times:");
            for (phase, seconds) in &record.times {
                println!("  {:<14} {:.6}s", phase, seconds);
            }
            println!("body:        {} bytes", record.content.len());
        }
        ["har"] => {
            let records = store.load_all()?;
            println!("{}", Exporter::new(ExportFormat::Har).export(&records)?);
        }
        ["bindings"] => {
            print!("{}", Registry::global().export_table());
        }
        other => bail!("Unknown command: {}", other.join(" ")),
    }

    Ok(())
}
