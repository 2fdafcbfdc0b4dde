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

//! The device boundary.
//!
//! The coordinator never touches sample data or output hardware directly. A
//! [`Device`] hands out [`ChannelBackend`]s, each of which plays one clip at a time
//! with the usual volume/pitch/loop/bus controls, and manages clip residency
//! through [`ClipProvider`].
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::sound::{ClipRef, OutputBus};

pub mod mock;

/// Errors reported by a device backend.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("unknown audio device {0}")]
    UnknownDevice(String),

    #[error("device could not create a channel: {0}")]
    ChannelUnavailable(String),

    #[error("clip {0} is not loaded")]
    ClipNotLoaded(String),

    #[error("device refused to bind clip {0}")]
    BindRefused(String),

    #[error("device refused to play: {0}")]
    PlaybackRefused(String),

    #[error("failed to load clip {0}: {1}")]
    Load(String, String),
}

/// A single playback channel on a device.
pub trait ChannelBackend: Send {
    /// Binds a clip to the channel.
    fn set_clip(&mut self, clip: &ClipRef) -> Result<(), BackendError>;

    /// Removes whatever clip is bound.
    fn clear_clip(&mut self);

    /// Sets the channel volume in [0, 1].
    fn set_volume(&mut self, volume: f32);

    /// Sets the pitch multiplier.
    fn set_pitch(&mut self, pitch: f32);

    /// Sets whether the bound clip loops.
    fn set_loop(&mut self, looping: bool);

    /// Routes the channel to the given bus, or the default output.
    fn set_output_bus(&mut self, bus: Option<&OutputBus>);

    /// Starts the bound clip.
    fn play(&mut self) -> Result<(), BackendError>;

    /// Plays a clip over whatever the channel is doing without binding it.
    fn play_one_shot(&mut self, clip: &ClipRef, volume: f32) -> Result<(), BackendError>;

    fn pause(&mut self);

    fn resume(&mut self);

    fn stop(&mut self);

    /// Returns true while the bound clip is audible.
    fn is_playing(&self) -> bool;

    /// Returns the playback position of the bound clip.
    fn time(&self) -> Duration;

    /// Seeks the bound clip.
    fn set_time(&mut self, time: Duration);
}

/// Manages residency of clip sample data.
pub trait ClipProvider: Send + Sync {
    /// Makes the clip's data available for playback.
    fn load(&self, clip: &ClipRef) -> Result<(), BackendError>;

    /// Releases the clip's data.
    fn unload(&self, clip: &ClipRef);
}

/// An audio device that hands out playback channels.
pub trait Device: ClipProvider + fmt::Display {
    /// Creates a new playback channel. Dropping the channel releases it.
    fn create_channel(&self) -> Result<Box<dyn ChannelBackend>, BackendError>;
}

/// Gets a device with the given name.
pub fn get_device(name: &str) -> Result<Arc<dyn Device>, BackendError> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(name)));
    }

    Err(BackendError::UnknownDevice(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_mock_device() {
        let device = get_device("mock-output").expect("mock device");
        assert_eq!(device.to_string(), "mock-output (Mock)");
    }

    #[test]
    fn test_get_unknown_device() {
        assert!(matches!(
            get_device("speakers"),
            Err(BackendError::UnknownDevice(name)) if name == "speakers"
        ));
    }
}
