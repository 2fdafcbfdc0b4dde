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
use std::error::Error;
use std::path::PathBuf;

use clap::{crate_version, Parser, Subcommand};
use tokio::time::Instant;
use tracing::{error, info};

use soundstage::config::{self, Cue, CueAction, CueScript};
use soundstage::coordinator::PlaybackCoordinator;
use soundstage::driver::TickDriver;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A playback coordinator for interactive audio."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the persistent and bank sounds in the given config.
    Sounds {
        /// The path to the coordinator config.
        config_path: String,
    },
    /// Verifies the given config and its sound banks.
    Verify {
        /// The path to the coordinator config.
        config_path: String,
    },
    /// Runs a cue script against a coordinator.
    Run {
        /// The path to the coordinator config.
        config_path: String,
        /// The path to the cue script.
        cue_script: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sounds { config_path } => {
            let config = config::load_config(&PathBuf::from(&config_path))?;

            println!("Sounds (count: {}):", config.sounds().len());
            for sound in config.sounds() {
                println!("- {}", sound.to_sound());
            }

            for (name, bank) in config.load_banks()? {
                println!("\nBank {} (count: {}):", name, bank.sounds().len());
                for sound in bank.to_sounds() {
                    println!("- {}", sound);
                }
            }
        }
        Commands::Verify { config_path } => {
            let config = config::load_config(&PathBuf::from(&config_path))?;
            let problems = config.validate();

            if problems.is_empty() {
                println!("{} is valid.", config_path);
                return Ok(());
            }

            println!("Problems (count: {}):", problems.len());
            for problem in problems.iter() {
                println!("- {}", problem);
            }
            return Err(format!("{} has {} problems", config_path, problems.len()).into());
        }
        Commands::Run {
            config_path,
            cue_script,
        } => {
            let config = config::load_config(&PathBuf::from(&config_path))?;
            let script = CueScript::deserialize(&PathBuf::from(&cue_script))?;
            let mut coordinator = config::init_coordinator(&config)?;
            let mut driver = TickDriver::new(config.tick_rate());
            info!(
                cues = script.cues().len(),
                length_ms = script.length()?.as_millis(),
                "Running cue script"
            );

            let start = Instant::now();
            for cue in script.cues() {
                let at = cue.at()?;
                while start.elapsed() < at {
                    driver.tick(&mut coordinator).await;
                }

                if let Err(e) = run_cue(&mut coordinator, &config, cue) {
                    error!(action = ?cue.action(), err = %e, "Cue failed");
                }
                info!(
                    at_ms = at.as_millis(),
                    action = ?cue.action(),
                    slot = %coordinator.slot_state(),
                    "Cue"
                );
            }

            driver.settle(&mut coordinator).await;
            coordinator.shutdown();
            info!(ticks = driver.ticks(), "Cue script finished");
        }
    }

    Ok(())
}

/// Runs a single cue against the coordinator.
fn run_cue(
    coordinator: &mut PlaybackCoordinator,
    config: &config::Coordinator,
    cue: &Cue,
) -> Result<(), Box<dyn Error>> {
    match cue.action() {
        CueAction::Play => coordinator.play(cue.sound()?, cue.start()?, cue.fade()?)?,
        CueAction::PlayOneShot => coordinator.play_one_shot(cue.sound()?)?,
        CueAction::Stop => coordinator.stop(cue.fade()?)?,
        CueAction::PauseToggle => {
            coordinator.pause_toggle()?;
        }
        CueAction::Crossfade => {
            coordinator.crossfade_to(cue.sound()?, cue.fade_out()?, cue.fade_in()?)?
        }
        CueAction::LoadBank => config::load_bank(coordinator, config, cue.bank()?)?,
        CueAction::UnloadBank => coordinator.unload_bank(cue.bank()?)?,
    }
    Ok(())
}
