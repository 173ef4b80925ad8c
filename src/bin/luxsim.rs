// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! LuxSim - publishes simulated device telemetry for exercising the bridge

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::{info, warn};

use luxbridge::{LightSimulator, MqttPublisher, Settings, VERSION};

/// Simulated light-control device
#[derive(Parser, Debug)]
#[command(name = "luxsim")]
#[command(version = VERSION)]
#[command(about = "Publish simulated luminosity and LED state readings over MQTT")]
struct Args {
    /// Seconds between readings (defaults to INTERVALO_LECTURA)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Stop after this many readings
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    count: Option<u64>,

    /// Seed for a reproducible reading sequence
    #[arg(long)]
    seed: Option<u64>,

    /// MQTT client id
    #[arg(long, env = "SIM_CLIENT_ID", default_value = "Simulador_ESP32_IoT")]
    client_id: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load()?;
    luxbridge::init_logging(settings.log_level)?;

    settings.bus.client_id = args.client_id;
    let interval = args
        .interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| settings.producer.interval());
    anyhow::ensure!(!interval.is_zero(), "reading interval must be at least one second");

    let threshold = settings.classification.threshold;
    let mut simulator = match args.seed {
        Some(seed) => LightSimulator::with_seed(threshold, seed),
        None => LightSimulator::new(threshold),
    };

    info!("LuxSim v{} - simulated light-control device", VERSION);
    info!("Threshold {}: LED on at or below, off above", threshold);

    let publisher = MqttPublisher::connect(&settings.bus).await?;
    info!("Publishing every {:?}, press Ctrl+C to stop", interval);

    let mut ticker = tokio::time::interval(interval);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let sample = simulator.sample();
                info!(
                    "Reading #{}: luminosity={} led={} ({})",
                    sample.sequence,
                    sample.luminosity,
                    sample.actuator_state,
                    sample.classification(threshold)
                );

                if let Err(e) = simulator.publish(&publisher, &settings.topics, &sample).await {
                    warn!("Failed to publish reading: {}", e);
                }

                if args.count.is_some_and(|count| sample.sequence >= count) {
                    break;
                }
            }
        }
    }

    info!("Stopping simulator...");
    publisher.disconnect().await?;
    info!("Simulator stopped");
    Ok(())
}
