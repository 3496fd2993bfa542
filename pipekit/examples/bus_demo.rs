// SPDX-FileCopyrightText: 2025 2025 Contributors to the pipekit project.
// SPDX-License-Identifier: Apache-2.0

//! Several producer threads report progress over one bus while the main
//! thread drains it.
//!
//! Progress messages are queued normally, warnings are hidden by the sync
//! handler, and the final error of each producer is delivered `Async` so the
//! producer only exits once the main thread has handled it.
//!
//! ```text
//! cargo run --example bus_demo -- --producers 4 --steps 10
//! ```

mod common;

use std::{thread, time::Duration};

use clap::Parser;
use pipekit::{Bus, BusConfig, BusSyncReply, Message, MessageType, Object, Structure};
use tracing::{info, warn};

#[derive(Parser)]
#[command(version, about = "Drain messages from concurrent producers")]
struct Cli {
    /// Number of producer threads
    #[arg(short, long, default_value_t = 3)]
    producers: usize,

    /// Progress messages per producer
    #[arg(short, long, default_value_t = 5)]
    steps: i32,

    /// Delay between progress messages, in milliseconds
    #[arg(long, default_value_t = 10)]
    delay_ms: u64,
}

fn main() -> Result<(), pipekit::Error> {
    common::setup_logging();
    let cli = Cli::parse();

    let bus = Bus::with_config(BusConfig::default().name("demo"));
    bus.set_sync_handler(|_, msg| match msg.kind() {
        MessageType::Warning => BusSyncReply::Drop,
        MessageType::Error => BusSyncReply::Async,
        _ => BusSyncReply::Pass,
    });

    let mut handles = Vec::new();
    for p in 0..cli.producers {
        let bus = bus.clone();
        let delay = Duration::from_millis(cli.delay_ms);
        let steps = cli.steps;
        handles.push(thread::spawn(move || -> Result<(), pipekit::Error> {
            let src = Object::new(Some(&format!("producer{p}")));
            for step in 1..=steps {
                let progress = Structure::builder("progress")
                    .field("step", step)
                    .field("total", steps)
                    .build()?;
                bus.post(Message::new_application(Some(&src), progress));
                bus.post(Message::new_warning(Some(&src), "slow step", None));
                thread::sleep(delay);
            }
            bus.post(Message::new_error(Some(&src), "producer finished", None));
            info!("{} released", src.name());
            Ok(())
        }));
    }

    let mut finished = 0;
    while finished < cli.producers {
        let Some(msg) = bus.timed_pop(Some(Duration::from_secs(5))) else {
            warn!("No message for 5 seconds, giving up");
            break;
        };
        let src = msg.src().map(|s| s.name()).unwrap_or_default();
        match msg.kind() {
            MessageType::Application => {
                if let Some(s) = msg.structure() {
                    info!("{src}: step {}/{}", s.get::<i32>("step")?, s.get::<i32>("total")?);
                }
            }
            MessageType::Error => {
                if let Some((text, _)) = msg.parse_error() {
                    info!("{src}: {text}");
                }
                finished += 1;
            }
            other => warn!("Unexpected {other} message"),
        }
    }

    for handle in handles {
        match handle.join() {
            Ok(result) => result?,
            Err(_) => warn!("A producer thread panicked"),
        }
    }
    Ok(())
}
