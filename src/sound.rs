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

//! Sound assets.
//!
//! A sound asset is the immutable description of something playable: an ordered
//! list of clips, the policy for choosing between them, and the volume, pitch,
//! loop and bus settings applied to whatever channel ends up playing it. The only
//! mutable part is the index of the most recently selected clip.

mod selector;

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub use selector::ClipSelector;

/// Default pitch multiplier (identity).
pub const DEFAULT_PITCH: f32 = 1.0;

/// Default sound volume.
pub const DEFAULT_VOLUME: f32 = 1.0;

/// A reference to a clip's sample data. Resolved by the clip provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClipRef(String);

impl ClipRef {
    /// Creates a new clip reference.
    pub fn new(name: impl Into<String>) -> ClipRef {
        ClipRef(name.into())
    }

    /// Returns the clip name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An opaque handle naming the mixer bus a sound is routed to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OutputBus(String);

impl OutputBus {
    /// Creates a new output bus handle.
    pub fn new(name: impl Into<String>) -> OutputBus {
        OutputBus(name.into())
    }

    /// Returns the bus name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

/// How the next clip is chosen each time a sound plays.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// Play whichever clip was last set through `set_clip_index`.
    #[default]
    Manual,
    /// Step through the clips in order, wrapping after the last one.
    Ordered,
    /// Pick uniformly at random. Repeats are allowed.
    Random,
    /// Reserved. Keeps playing the current clip.
    Additive,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionMode::Manual => "manual",
            SelectionMode::Ordered => "ordered",
            SelectionMode::Random => "random",
            SelectionMode::Additive => "additive",
        };
        write!(f, "{}", name)
    }
}

/// A playable sound.
pub struct SoundAsset {
    /// Unique, case-sensitive identifier.
    id: String,
    /// The clips this sound can play.
    clips: Vec<ClipRef>,
    /// The clip selection policy.
    selection: SelectionMode,
    /// Target volume in [0, 1].
    volume: f32,
    /// Pitch multiplier.
    pitch: f32,
    /// Whether the clip loops.
    looping: bool,
    /// The mixer bus to route to, if any.
    output_bus: Option<OutputBus>,
    /// Index of the last selected clip. None until the first selection.
    clip_index: Mutex<Option<usize>>,
}

impl SoundAsset {
    /// Creates a new sound asset with default settings.
    pub fn new(id: impl Into<String>, clips: Vec<ClipRef>) -> SoundAsset {
        let id = id.into();
        if clips.is_empty() {
            warn!(sound = id, "Sound has no clips and will not play");
        }

        SoundAsset {
            id,
            clips,
            selection: SelectionMode::default(),
            volume: DEFAULT_VOLUME,
            pitch: DEFAULT_PITCH,
            looping: false,
            output_bus: None,
            clip_index: Mutex::new(None),
        }
    }

    /// Sets the clip selection mode.
    pub fn with_selection(mut self, selection: SelectionMode) -> SoundAsset {
        self.selection = selection;
        self
    }

    /// Sets the volume. Values outside [0, 1] are clamped.
    pub fn with_volume(mut self, volume: f32) -> SoundAsset {
        if !(0.0..=1.0).contains(&volume) {
            warn!(sound = self.id, volume, "Volume out of range, clamping");
        }
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Sets the pitch multiplier.
    pub fn with_pitch(mut self, pitch: f32) -> SoundAsset {
        self.pitch = pitch;
        self
    }

    /// Sets whether the sound loops.
    pub fn with_loop(mut self, looping: bool) -> SoundAsset {
        self.looping = looping;
        self
    }

    /// Sets the output bus.
    pub fn with_output_bus(mut self, output_bus: Option<OutputBus>) -> SoundAsset {
        self.output_bus = output_bus;
        self
    }

    /// Sets the initial clip index. Only meaningful for manual selection.
    pub fn with_clip_index(self, index: usize) -> SoundAsset {
        self.set_clip_index(index);
        self
    }

    /// Returns the sound identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the clips.
    pub fn clips(&self) -> &[ClipRef] {
        &self.clips
    }

    /// Returns the clip at the given index.
    pub fn clip(&self, index: usize) -> Option<&ClipRef> {
        self.clips.get(index)
    }

    /// Returns the selection mode.
    pub fn selection(&self) -> SelectionMode {
        self.selection
    }

    /// Returns the volume.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Returns the pitch.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Returns true if the sound loops.
    pub fn looping(&self) -> bool {
        self.looping
    }

    /// Returns the output bus.
    pub fn output_bus(&self) -> Option<&OutputBus> {
        self.output_bus.as_ref()
    }

    /// Returns the index of the last selected clip.
    pub fn clip_index(&self) -> Option<usize> {
        *self.clip_index.lock()
    }

    /// Sets the clip to play next under manual selection. Returns false if the
    /// index was ignored, either because it is out of range or because the sound
    /// selects clips automatically.
    pub fn set_clip_index(&self, index: usize) -> bool {
        if self.selection != SelectionMode::Manual {
            warn!(
                sound = self.id,
                mode = %self.selection,
                index,
                "Clip index only applies to manual selection, ignoring"
            );
            return false;
        }
        if index >= self.clips.len() {
            warn!(
                sound = self.id,
                index,
                clips = self.clips.len(),
                "Clip index out of range, ignoring"
            );
            return false;
        }

        *self.clip_index.lock() = Some(index);
        true
    }

    /// Records the outcome of a clip selection.
    pub(crate) fn record_selection(&self, index: usize) {
        *self.clip_index.lock() = Some(index);
    }
}

impl fmt::Debug for SoundAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundAsset")
            .field("id", &self.id)
            .field("clips", &self.clips.len())
            .field("selection", &self.selection)
            .field("volume", &self.volume)
            .field("pitch", &self.pitch)
            .field("looping", &self.looping)
            .finish()
    }
}

impl fmt::Display for SoundAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Clips: {}, Selection: {}, Volume: {:.2}{})",
            self.id,
            self.clips.len(),
            self.selection,
            self.volume,
            if self.looping { ", Looping" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clips(names: &[&str]) -> Vec<ClipRef> {
        names.iter().map(|name| ClipRef::new(*name)).collect()
    }

    #[test]
    fn test_volume_is_clamped() {
        let sound = SoundAsset::new("loud", clips(&["a"])).with_volume(1.5);
        assert_eq!(sound.volume(), 1.0);

        let sound = SoundAsset::new("quiet", clips(&["a"])).with_volume(-0.5);
        assert_eq!(sound.volume(), 0.0);
    }

    #[test]
    fn test_set_clip_index_manual() {
        let sound = SoundAsset::new("steps", clips(&["a", "b", "c"]));
        assert_eq!(sound.clip_index(), None);
        assert!(sound.set_clip_index(2));
        assert_eq!(sound.clip_index(), Some(2));

        // Out of range leaves the previous index alone.
        assert!(!sound.set_clip_index(3));
        assert_eq!(sound.clip_index(), Some(2));
    }

    #[test]
    fn test_set_clip_index_ignored_for_automatic_modes() {
        let sound = SoundAsset::new("steps", clips(&["a", "b", "c"]))
            .with_selection(SelectionMode::Ordered);
        assert!(!sound.set_clip_index(1));
        assert_eq!(sound.clip_index(), None);
    }

    #[test]
    fn test_display() {
        let sound = SoundAsset::new("theme", clips(&["a", "b"]))
            .with_selection(SelectionMode::Ordered)
            .with_volume(0.5)
            .with_loop(true);
        assert_eq!(
            sound.to_string(),
            "theme (Clips: 2, Selection: ordered, Volume: 0.50, Looping)"
        );
    }
}
