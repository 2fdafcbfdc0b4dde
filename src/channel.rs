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

//! Playback channels.
//!
//! A channel wraps one device channel and remembers which sound and clip it is
//! bound to. Channels are owned by the [`ChannelPool`]; everything else refers to
//! them by [`ChannelId`].

mod pool;

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::backend::{BackendError, ChannelBackend};
use crate::sound::{ClipRef, SoundAsset};

pub use pool::{ChannelPool, PoolError, DEFAULT_MAX_CHANNELS};

/// Identifies a channel within its pool. Ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(u64);

impl ChannelId {
    pub(crate) fn new(id: u64) -> ChannelId {
        ChannelId(id)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The playback state of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Playing,
    Paused,
}

/// A leased playback channel.
pub struct Channel {
    id: ChannelId,
    backend: Box<dyn ChannelBackend>,
    /// The sound this channel is bound to. Weak so an unregistered sound isn't kept alive.
    sound: Option<Weak<SoundAsset>>,
    clip: Option<ClipRef>,
    state: ChannelState,
    /// The last volume applied to the backend.
    volume: f32,
}

impl Channel {
    pub(crate) fn new(id: ChannelId, backend: Box<dyn ChannelBackend>) -> Channel {
        Channel {
            id,
            backend,
            sound: None,
            clip: None,
            state: ChannelState::Idle,
            volume: 1.0,
        }
    }

    /// Returns the channel id.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// Returns the playback state. A clip that ran out on its own reads as idle.
    pub fn state(&self) -> ChannelState {
        match self.state {
            ChannelState::Playing if !self.backend.is_playing() => ChannelState::Idle,
            state => state,
        }
    }

    /// Returns true while the bound clip is audible.
    pub fn is_playing(&self) -> bool {
        self.state() == ChannelState::Playing
    }

    /// Returns the sound this channel is bound to, if it's still alive.
    pub fn sound(&self) -> Option<Arc<SoundAsset>> {
        self.sound.as_ref().and_then(Weak::upgrade)
    }

    /// Returns true if the channel is bound to the given sound.
    pub fn is_bound_to(&self, sound: &SoundAsset) -> bool {
        self.sound
            .as_ref()
            .is_some_and(|bound| std::ptr::eq(bound.as_ptr(), sound))
    }

    /// Returns the bound clip.
    pub fn clip(&self) -> Option<&ClipRef> {
        self.clip.as_ref()
    }

    /// Returns the last applied volume.
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.backend.set_volume(volume);
    }

    /// Returns the playback position.
    pub fn time(&self) -> Duration {
        self.backend.time()
    }

    pub fn set_time(&mut self, time: Duration) {
        self.backend.set_time(time);
    }

    /// Binds the channel to a clip of the given sound and applies the sound's
    /// settings. Any previous binding is released first. If the device refuses the
    /// clip the channel is left idle and unbound.
    pub fn bind(&mut self, sound: &Arc<SoundAsset>, clip: &ClipRef) -> Result<(), BackendError> {
        self.unbind();

        if let Err(e) = self.backend.set_clip(clip) {
            self.unbind();
            return Err(e);
        }

        self.backend.set_pitch(sound.pitch());
        self.backend.set_loop(sound.looping());
        self.backend.set_output_bus(sound.output_bus());
        self.set_volume(sound.volume());
        self.sound = Some(Arc::downgrade(sound));
        self.clip = Some(clip.clone());

        debug!(channel = %self.id, sound = sound.id(), clip = %clip, "Channel bound");
        Ok(())
    }

    /// Releases the current binding, stopping playback.
    pub fn unbind(&mut self) {
        if self.state != ChannelState::Idle {
            self.backend.stop();
        }
        self.backend.clear_clip();
        self.sound = None;
        self.clip = None;
        self.state = ChannelState::Idle;
    }

    /// Starts the bound clip. On failure the channel is rolled back to idle.
    pub fn play(&mut self) -> Result<(), BackendError> {
        match self.backend.play() {
            Ok(()) => {
                self.state = ChannelState::Playing;
                Ok(())
            }
            Err(e) => {
                self.unbind();
                Err(e)
            }
        }
    }

    /// Plays a clip over the channel without changing its binding.
    pub fn play_one_shot(&mut self, clip: &ClipRef, volume: f32) -> Result<(), BackendError> {
        self.backend.play_one_shot(clip, volume)
    }

    /// Pauses the channel. Returns false if it wasn't playing.
    pub fn pause(&mut self) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.backend.pause();
        self.state = ChannelState::Paused;
        true
    }

    /// Resumes a paused channel. Returns false if it wasn't paused.
    pub fn resume(&mut self) -> bool {
        if self.state != ChannelState::Paused {
            return false;
        }
        self.backend.resume();
        self.state = ChannelState::Playing;
        true
    }

    /// Stops playback, keeping the binding.
    pub fn stop(&mut self) {
        self.backend.stop();
        self.state = ChannelState::Idle;
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id)
            .field("clip", &self.clip)
            .field("state", &self.state())
            .field("volume", &self.volume)
            .finish()
    }
}
