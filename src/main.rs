// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use clap::{crate_version, Parser, Subcommand};
use gridloop::samples::SampleLoader;
use gridloop::{audio, config, midi};
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=quantized loop sequencer

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/gridloop
ExecStart=/usr/local/bin/gridloop start "$GRIDLOOP_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=gridloop.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A quantized loop sequencer and drum sampler."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists and verifies all samples in the given looper config.
    Samples {
        /// The path to the looper config.
        config_path: String,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Lists the available MIDI input/output devices.
    MidiDevices {},
    /// Start will start the looper.
    Start {
        /// The path to the looper config.
        config_path: String,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Samples { config_path } => {
            let looper = config::Looper::load(&PathBuf::from(&config_path))?;
            let (samples, _) = looper.samples()?;

            if samples.is_empty() {
                println!("No samples found in {}.", config_path);
                return Ok(());
            }

            let mut loader = SampleLoader::new(looper.audio().sample_rate());
            let mut failed = 0;
            println!("Samples (count: {}):", samples.len());
            for sample in samples.iter() {
                match loader.load(sample.file()) {
                    Ok(loaded) => println!(
                        "- {} ({} channels, {:.2}s)",
                        sample,
                        loaded.channel_count(),
                        loaded.duration().as_secs_f64()
                    ),
                    Err(e) => {
                        failed += 1;
                        println!("- {} (error: {})", sample, e);
                    }
                }
            }

            println!(
                "\nLoaded {} bytes of sample data.",
                loader.total_memory_usage()
            );
            if failed > 0 {
                return Err(format!("{} samples failed to load", failed).into());
            }
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::MidiDevices {} => {
            let devices = midi::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Start { config_path } => {
            let (engine, mut controller) =
                config::init_looper_and_controller(&PathBuf::from(config_path))?;

            tokio::select! {
                result = controller.join() => {
                    if let Err(e) = result {
                        warn!(err = %e, "Controller failed.");
                    }
                    // Loops keep playing without input until we're told to stop.
                    info!("All inputs closed, waiting for shutdown.");
                    tokio::signal::ctrl_c().await?;
                }
                result = tokio::signal::ctrl_c() => result?,
            }

            info!(status = %engine.handle().status(), "Shutting down.");
            engine.stop();
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
