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

use config::{Config, File};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::sound::{ClipRef, OutputBus, SelectionMode, SoundAsset, DEFAULT_PITCH, DEFAULT_VOLUME};

/// A YAML representation of a sound.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct SoundDefinition {
    /// The unique, case-sensitive sound id.
    id: String,

    /// The clips the sound can play.
    #[serde(default)]
    clips: Vec<String>,

    /// How clips are selected.
    #[serde(default)]
    selection: SelectionMode,

    /// The initial clip for manual selection.
    clip_index: Option<usize>,

    /// Target volume in [0, 1].
    #[serde(default = "default_volume")]
    volume: f32,

    /// Pitch multiplier.
    #[serde(default = "default_pitch")]
    pitch: f32,

    /// Whether the sound loops.
    #[serde(default, rename = "loop")]
    looping: bool,

    /// The mixer bus to route to.
    output_bus: Option<String>,
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_pitch() -> f32 {
    DEFAULT_PITCH
}

impl SoundDefinition {
    /// Creates a sound definition with default settings.
    pub fn new(id: &str, clips: &[&str]) -> SoundDefinition {
        SoundDefinition {
            id: id.to_string(),
            clips: clips.iter().map(|clip| clip.to_string()).collect(),
            selection: SelectionMode::default(),
            clip_index: None,
            volume: DEFAULT_VOLUME,
            pitch: DEFAULT_PITCH,
            looping: false,
            output_bus: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn clips(&self) -> &[String] {
        &self.clips
    }

    pub fn selection(&self) -> SelectionMode {
        self.selection
    }

    /// Builds the sound asset. Out of range values fall back the same way the
    /// asset builders do.
    pub fn to_sound(&self) -> SoundAsset {
        let sound = SoundAsset::new(
            self.id.clone(),
            self.clips.iter().map(ClipRef::new).collect(),
        )
        .with_selection(self.selection)
        .with_volume(self.volume)
        .with_pitch(self.pitch)
        .with_loop(self.looping)
        .with_output_bus(self.output_bus.as_ref().map(OutputBus::new));

        match self.clip_index {
            Some(index) => sound.with_clip_index(index),
            None => sound,
        }
    }

    /// Returns a description of every problem with this definition.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.id.is_empty() {
            problems.push("sound has an empty id".to_string());
        }
        if self.clips.is_empty() {
            problems.push(format!("sound {} has no clips", self.id));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            problems.push(format!(
                "sound {} has volume {} outside [0, 1]",
                self.id, self.volume
            ));
        }
        if self.pitch <= 0.0 {
            problems.push(format!(
                "sound {} has non-positive pitch {}",
                self.id, self.pitch
            ));
        }
        if let Some(index) = self.clip_index {
            if self.selection != SelectionMode::Manual {
                problems.push(format!(
                    "sound {} sets clip_index but uses {} selection",
                    self.id, self.selection
                ));
            } else if index >= self.clips.len() {
                problems.push(format!(
                    "sound {} has clip_index {} but only {} clips",
                    self.id,
                    index,
                    self.clips.len()
                ));
            }
        }
        problems
    }
}

/// A YAML representation of a sound bank. A bank holds the sounds for one scene.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct SoundBank {
    /// The sounds in the bank.
    #[serde(default)]
    sounds: Vec<SoundDefinition>,
}

impl SoundBank {
    pub fn new(sounds: Vec<SoundDefinition>) -> SoundBank {
        SoundBank { sounds }
    }

    /// Parse a sound bank from a YAML file.
    pub fn deserialize(path: &Path) -> Result<SoundBank, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<SoundBank>()?)
    }

    pub fn sounds(&self) -> &[SoundDefinition] {
        &self.sounds
    }

    /// Builds the sound assets for every sound in the bank.
    pub fn to_sounds(&self) -> Vec<SoundAsset> {
        self.sounds.iter().map(SoundDefinition::to_sound).collect()
    }

    /// Returns a description of every problem with the bank.
    pub fn validate(&self) -> Vec<String> {
        let mut problems: Vec<String> = self
            .sounds
            .iter()
            .flat_map(SoundDefinition::validate)
            .collect();

        let mut seen = std::collections::HashSet::new();
        for sound in self.sounds.iter() {
            if !seen.insert(sound.id()) {
                problems.push(format!("sound {} is defined more than once", sound.id()));
            }
        }
        problems
    }
}
