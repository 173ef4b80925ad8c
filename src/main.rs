// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/luxbridge

//! LuxBridge - MQTT to SQL bridge for the light-control pipeline
//!
//! Configuration comes entirely from the environment (see `Settings`).

use anyhow::Result;
use tracing::{error, info};

use luxbridge::{Bridge, MqttConnector, Settings, SqliteConnector, VERSION};

fn main() -> Result<()> {
    let settings = Settings::load()?;
    luxbridge::init_logging(settings.log_level)?;

    info!("LuxBridge v{} - MQTT to SQL light telemetry bridge", VERSION);
    settings.log_summary();

    // Single thread of control: messages are handled strictly one at a time
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let bridge = Bridge::new(settings, SqliteConnector, MqttConnector);
    let outcome = rt.block_on(bridge.run(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }));

    match outcome {
        Ok(_) => {
            info!("LuxBridge shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!("The bridge cannot run: {}", e);
            Err(e.into())
        }
    }
}
