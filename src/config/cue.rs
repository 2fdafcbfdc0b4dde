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
use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use serde::Deserialize;

use super::error::ConfigError;
use super::parse_duration;

/// What a cue does.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CueAction {
    Play,
    PlayOneShot,
    Stop,
    PauseToggle,
    Crossfade,
    LoadBank,
    UnloadBank,
}

/// A YAML representation of a single cue.
#[derive(Deserialize, Clone, Debug)]
pub struct Cue {
    /// When the cue fires, relative to the start of the script.
    at: String,

    /// The action to run.
    action: CueAction,

    /// The sound the action applies to.
    sound: Option<String>,

    /// The bank the action applies to.
    bank: Option<String>,

    /// Where playback starts.
    start: Option<String>,

    /// Fade duration for play and stop.
    fade: Option<String>,

    /// Crossfade durations.
    fade_out: Option<String>,
    fade_in: Option<String>,
}

impl Cue {
    /// Returns when the cue fires.
    pub fn at(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.at)
    }

    pub fn action(&self) -> CueAction {
        self.action
    }

    /// Returns the sound, which play, one-shot and crossfade cues require.
    pub fn sound(&self) -> Result<&str, ConfigError> {
        self.sound
            .as_deref()
            .ok_or_else(|| self.missing("sound"))
    }

    /// Returns the bank, which bank cues require.
    pub fn bank(&self) -> Result<&str, ConfigError> {
        self.bank.as_deref().ok_or_else(|| self.missing("bank"))
    }

    pub fn start(&self) -> Result<Duration, ConfigError> {
        optional_duration(&self.start)
    }

    pub fn fade(&self) -> Result<Duration, ConfigError> {
        optional_duration(&self.fade)
    }

    pub fn fade_out(&self) -> Result<Duration, ConfigError> {
        optional_duration(&self.fade_out)
    }

    pub fn fade_in(&self) -> Result<Duration, ConfigError> {
        optional_duration(&self.fade_in)
    }

    fn missing(&self, field: &str) -> ConfigError {
        ConfigError::Invalid(format!(
            "cue at {} ({:?}) is missing {}",
            self.at, self.action, field
        ))
    }

    /// Checks that the cue has everything its action needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.at()?;
        self.start()?;
        self.fade()?;
        self.fade_out()?;
        self.fade_in()?;
        match self.action {
            CueAction::Play | CueAction::PlayOneShot | CueAction::Crossfade => {
                self.sound()?;
            }
            CueAction::LoadBank | CueAction::UnloadBank => {
                self.bank()?;
            }
            CueAction::Stop | CueAction::PauseToggle => {}
        }
        Ok(())
    }
}

fn optional_duration(value: &Option<String>) -> Result<Duration, ConfigError> {
    match value {
        Some(value) => parse_duration(value),
        None => Ok(Duration::ZERO),
    }
}

/// A YAML representation of a cue script: a timed list of coordinator commands.
#[derive(Deserialize, Clone, Debug)]
pub struct CueScript {
    cues: Vec<Cue>,
}

impl CueScript {
    /// Parse a cue script from a YAML file. Cues are sorted by time.
    pub fn deserialize(path: &Path) -> Result<CueScript, ConfigError> {
        let script = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<CueScript>()?;
        script.sorted()
    }

    fn sorted(self) -> Result<CueScript, ConfigError> {
        let mut timed = self
            .cues
            .into_iter()
            .map(|cue| {
                cue.validate()?;
                Ok((cue.at()?, cue))
            })
            .collect::<Result<Vec<(Duration, Cue)>, ConfigError>>()?;
        timed.sort_by_key(|(at, _)| *at);
        Ok(CueScript {
            cues: timed.into_iter().map(|(_, cue)| cue).collect(),
        })
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Returns when the last cue fires.
    pub fn length(&self) -> Result<Duration, ConfigError> {
        match self.cues.last() {
            Some(cue) => cue.at(),
            None => Ok(Duration::ZERO),
        }
    }
}
