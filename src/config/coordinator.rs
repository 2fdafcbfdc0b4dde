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
use std::path::{Path, PathBuf};

use config::{Config, File};
use serde::Deserialize;

use super::error::ConfigError;
use super::sound::{SoundBank, SoundDefinition};
use crate::channel::DEFAULT_MAX_CHANNELS;
use crate::coordinator::Settings;
use crate::envelope::FadeCurve;

/// Default tick driver frequency in Hz.
pub const DEFAULT_TICK_RATE: u32 = 60;

const DEFAULT_DEVICE: &str = "mock";

/// A YAML representation of the coordinator configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Coordinator {
    /// The device to play through.
    #[serde(default = "default_device")]
    device: String,

    /// How many times per second the coordinator is ticked.
    #[serde(default = "default_tick_rate")]
    tick_rate: u32,

    /// Maximum number of live channels, primary included.
    #[serde(default = "default_max_channels")]
    max_channels: usize,

    /// The curve every fade is shaped with.
    #[serde(default)]
    fade_curve: FadeCurve,

    /// A sound to play as soon as the coordinator is up.
    play_on_init: Option<String>,

    /// Sounds registered for the coordinator's lifetime.
    #[serde(default)]
    sounds: Vec<SoundDefinition>,

    /// Sound bank files, relative to the config file.
    #[serde(default)]
    banks: Vec<String>,

    /// The directory the config was loaded from.
    #[serde(skip)]
    base_path: Option<PathBuf>,
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_tick_rate() -> u32 {
    DEFAULT_TICK_RATE
}

fn default_max_channels() -> usize {
    DEFAULT_MAX_CHANNELS
}

impl Coordinator {
    /// Creates a coordinator configuration with default settings.
    pub fn new(sounds: Vec<SoundDefinition>) -> Coordinator {
        Coordinator {
            device: default_device(),
            tick_rate: DEFAULT_TICK_RATE,
            max_channels: DEFAULT_MAX_CHANNELS,
            fade_curve: FadeCurve::default(),
            play_on_init: None,
            sounds,
            banks: Vec::new(),
            base_path: None,
        }
    }

    /// Parse a coordinator configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Coordinator, ConfigError> {
        let mut coordinator = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Coordinator>()?;
        coordinator.base_path = path.parent().map(Path::to_path_buf);
        Ok(coordinator)
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn play_on_init(&self) -> Option<&str> {
        self.play_on_init.as_deref()
    }

    pub fn sounds(&self) -> &[SoundDefinition] {
        &self.sounds
    }

    /// Returns the coordinator settings.
    pub fn settings(&self) -> Settings {
        Settings {
            max_channels: self.max_channels,
            fade_curve: self.fade_curve,
        }
    }

    /// Returns the bank files, resolved against the config directory.
    pub fn bank_paths(&self) -> Vec<PathBuf> {
        self.banks
            .iter()
            .map(|bank| match &self.base_path {
                Some(base) => base.join(bank),
                None => PathBuf::from(bank),
            })
            .collect()
    }

    /// Loads every bank file, keyed by bank name (the file stem).
    pub fn load_banks(&self) -> Result<Vec<(String, SoundBank)>, ConfigError> {
        self.bank_paths()
            .into_iter()
            .map(|path| Ok((bank_name(&path)?, SoundBank::deserialize(&path)?)))
            .collect()
    }

    /// Returns a description of every problem with the configuration, banks
    /// included. Banks that can't be loaded are reported as problems.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.tick_rate == 0 {
            problems.push("tick_rate must be positive".to_string());
        }
        if self.max_channels == 0 {
            problems.push("max_channels must be positive".to_string());
        }

        problems.extend(SoundBank::new(self.sounds.clone()).validate());

        let mut bank_sounds = Vec::new();
        for path in self.bank_paths() {
            match SoundBank::deserialize(&path) {
                Ok(bank) => {
                    problems.extend(
                        bank.validate()
                            .into_iter()
                            .map(|problem| format!("{}: {}", path.display(), problem)),
                    );
                    bank_sounds.extend(bank.sounds().iter().map(|s| s.id().to_string()));
                }
                Err(e) => problems.push(format!("{}: {}", path.display(), e)),
            }
        }

        if let Some(id) = &self.play_on_init {
            if !self.sounds.iter().any(|sound| sound.id() == id) {
                problems.push(format!(
                    "play_on_init names {}, which is not a persistent sound",
                    id
                ));
            }
        }
        for id in bank_sounds {
            if self.sounds.iter().any(|sound| sound.id() == id) {
                problems.push(format!("bank sound {} shadows a persistent sound", id));
            }
        }
        problems
    }
}

/// Returns the name of the bank stored at the given path.
pub fn bank_name(path: &Path) -> Result<String, ConfigError> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::Invalid(format!("bad bank file name {}", path.display())))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "coordinator.yaml",
            "sounds:\n  - id: theme\n    clips: [theme.ogg]\n",
        );

        let config = Coordinator::deserialize(&path).unwrap();
        assert_eq!(config.device(), "mock");
        assert_eq!(config.tick_rate(), DEFAULT_TICK_RATE);
        assert_eq!(config.settings().max_channels, DEFAULT_MAX_CHANNELS);
        assert_eq!(config.settings().fade_curve, FadeCurve::Linear);
        assert_eq!(config.play_on_init(), None);
        assert!(config.bank_paths().is_empty());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_banks_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "forest.yaml",
            "sounds:\n  - id: birds\n    clips: [birds.ogg]\n",
        );
        let path = write(
            dir.path(),
            "coordinator.yaml",
            r#"
tick_rate: 30
max_channels: 4
fade_curve: equal_power
play_on_init: theme
sounds:
  - id: theme
    clips: [theme.ogg]
banks: [forest.yaml]
"#,
        );

        let config = Coordinator::deserialize(&path).unwrap();
        assert_eq!(config.tick_rate(), 30);
        assert_eq!(config.settings().max_channels, 4);
        assert_eq!(config.settings().fade_curve, FadeCurve::EqualPower);
        assert_eq!(config.play_on_init(), Some("theme"));
        assert_eq!(config.bank_paths(), vec![dir.path().join("forest.yaml")]);

        let banks = config.load_banks().unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].0, "forest");
        assert_eq!(banks[0].1.sounds()[0].id(), "birds");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "cave.yaml",
            "sounds:\n  - id: theme\n    clips: [drip.ogg]\n",
        );
        let path = write(
            dir.path(),
            "coordinator.yaml",
            r#"
tick_rate: 0
play_on_init: missing
sounds:
  - id: theme
    clips: []
banks: [cave.yaml, nowhere.yaml]
"#,
        );

        let problems = Coordinator::deserialize(&path).unwrap().validate();
        assert_eq!(problems.len(), 5, "{:?}", problems);
        assert!(problems.iter().any(|p| p.contains("tick_rate")));
        assert!(problems.iter().any(|p| p.contains("nowhere.yaml")));
        assert!(problems.iter().any(|p| p.contains("shadows")));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Coordinator::deserialize(Path::new("/nonexistent/coordinator.yaml")),
            Err(ConfigError::Load(_))
        ));
    }
}
