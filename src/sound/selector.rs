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

//! Clip selection policy.

use rand::Rng;
use tracing::{debug, warn};

use super::{SelectionMode, SoundAsset};

/// Chooses the next clip of a sound according to its selection mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClipSelector;

impl ClipSelector {
    /// Creates a new clip selector.
    pub fn new() -> ClipSelector {
        ClipSelector
    }

    /// Selects the next clip index for the sound and records it on the sound.
    /// Returns None if the sound has no clips.
    pub fn select(&self, sound: &SoundAsset) -> Option<usize> {
        self.select_with(sound, &mut rand::thread_rng())
    }

    /// Selects and records the next clip index using the given random source.
    pub fn select_with<R: Rng + ?Sized>(&self, sound: &SoundAsset, rng: &mut R) -> Option<usize> {
        let index = self.pick_with(sound, rng)?;
        sound.record_selection(index);
        Some(index)
    }

    /// Chooses the next clip index without recording it. Callers record the
    /// index on the sound once the clip is in use.
    pub fn pick(&self, sound: &SoundAsset) -> Option<usize> {
        self.pick_with(sound, &mut rand::thread_rng())
    }

    /// Chooses the next clip index using the given random source.
    pub fn pick_with<R: Rng + ?Sized>(&self, sound: &SoundAsset, rng: &mut R) -> Option<usize> {
        let count = sound.clips().len();
        if count == 0 {
            warn!(sound = sound.id(), "Sound has no clips to select from");
            return None;
        }

        let last = sound.clip_index();
        let index = match sound.selection() {
            SelectionMode::Manual => match last {
                Some(index) => index,
                None => {
                    warn!(
                        sound = sound.id(),
                        "Manual clip index was never set, defaulting to the first clip"
                    );
                    0
                }
            },
            SelectionMode::Ordered => last.map_or(0, |index| (index + 1) % count),
            SelectionMode::Random => rng.gen_range(0..count),
            SelectionMode::Additive => last.unwrap_or(0),
        };

        debug!(sound = sound.id(), index, mode = %sound.selection(), "Clip selected");
        Some(index)
    }
}
