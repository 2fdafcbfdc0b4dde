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
use std::path::Path;
use std::time::Duration;

use duration_string::DurationString;
use tracing::{error, info};

use crate::backend;
use crate::coordinator::PlaybackCoordinator;

mod coordinator;
mod cue;
mod error;
mod sound;

pub use self::coordinator::{bank_name, Coordinator, DEFAULT_TICK_RATE};
pub use self::cue::{Cue, CueAction, CueScript};
pub use self::error::ConfigError;
pub use self::sound::{SoundBank, SoundDefinition};

/// Parses a human duration such as "1500ms" or "2s".
pub(crate) fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
    DurationString::from_string(value.to_string())
        .map(Into::into)
        .map_err(|e| ConfigError::Duration(value.to_string(), e.to_string()))
}

/// Initializes a coordinator from the given config file: opens the device,
/// registers the persistent sounds and starts the play-on-init sound, if any.
/// Banks are left for the caller to load by scene.
pub fn init_coordinator(config: &Coordinator) -> Result<PlaybackCoordinator, Box<dyn Error>> {
    let device = backend::get_device(config.device())?;
    let mut coordinator = PlaybackCoordinator::init(device, config.settings())?;
    coordinator.register_sounds(config.sounds().iter().map(SoundDefinition::to_sound))?;

    if let Some(id) = config.play_on_init() {
        match coordinator.play(id, Duration::ZERO, Duration::ZERO) {
            Ok(()) => info!(sound = id, "Playing sound on init"),
            Err(e) => error!(sound = id, err = %e, "Unable to play sound on init"),
        }
    }

    Ok(coordinator)
}

/// Loads the named bank from the config's bank files into the coordinator.
pub fn load_bank(
    coordinator: &mut PlaybackCoordinator,
    config: &Coordinator,
    name: &str,
) -> Result<(), Box<dyn Error>> {
    for path in config.bank_paths() {
        if bank_name(&path)? == name {
            let bank = SoundBank::deserialize(&path)?;
            coordinator.load_bank(name, bank.to_sounds())?;
            return Ok(());
        }
    }
    Err(ConfigError::Invalid(format!("no bank file for bank {}", name)).into())
}

/// Loads a coordinator config file.
pub fn load_config(path: &Path) -> Result<Coordinator, ConfigError> {
    Coordinator::deserialize(path)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::coordinator::SlotState;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1500ms").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert!(matches!(
            parse_duration("later"),
            Err(ConfigError::Duration(_, _))
        ));
    }

    #[test]
    fn test_init_coordinator() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("forest.yaml"),
            "sounds:\n  - id: birds\n    clips: [birds.ogg]\n",
        )
        .unwrap();
        let path = dir.path().join("coordinator.yaml");
        fs::write(
            &path,
            r#"
device: mock-test
play_on_init: theme
sounds:
  - id: theme
    clips: [theme.ogg]
    loop: true
banks: [forest.yaml]
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        let mut coordinator = init_coordinator(&config).unwrap();
        assert_eq!(coordinator.slot_state(), SlotState::Playing);
        assert_eq!(coordinator.primary_sound().unwrap().id(), "theme");
        assert!(coordinator.sound("birds").is_none());

        load_bank(&mut coordinator, &config, "forest").unwrap();
        assert!(coordinator.sound("birds").is_some());
        assert!(load_bank(&mut coordinator, &config, "desert").is_err());
    }

    #[test]
    fn test_init_coordinator_unknown_device() {
        let config: Coordinator = {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("coordinator.yaml");
            fs::write(&path, "device: speakers\n").unwrap();
            load_config(&path).unwrap()
        };
        assert!(init_coordinator(&config).is_err());
    }
}
