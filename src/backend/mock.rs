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
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
    time::Duration,
};

use parking_lot::Mutex;
use tracing::debug;

use super::BackendError;
use crate::sound::{ClipRef, OutputBus};

/// Everything the mock device has been asked to do to a single channel.
#[derive(Clone, Debug)]
pub struct ChannelRecord {
    pub clip: Option<ClipRef>,
    pub volume: f32,
    pub pitch: f32,
    pub looping: bool,
    pub output_bus: Option<OutputBus>,
    pub playing: bool,
    pub paused: bool,
    pub time: Duration,
    pub play_calls: usize,
    pub stop_calls: usize,
    pub destroyed: bool,
}

impl Default for ChannelRecord {
    fn default() -> Self {
        ChannelRecord {
            clip: None,
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            output_bus: None,
            playing: false,
            paused: false,
            time: Duration::ZERO,
            play_calls: 0,
            stop_calls: 0,
            destroyed: false,
        }
    }
}

/// A one-shot played through the mock device.
#[derive(Clone, Debug, PartialEq)]
pub struct OneShot {
    pub channel: u64,
    pub clip: ClipRef,
    pub volume: f32,
}

#[derive(Default)]
struct State {
    next_channel: u64,
    channels: HashMap<u64, ChannelRecord>,
    loaded: HashSet<ClipRef>,
    load_calls: usize,
    unload_calls: usize,
    one_shots: Vec<OneShot>,
    refuse_play: bool,
    refuse_clips: HashSet<String>,
    refuse_loads: HashSet<String>,
    refuse_channels: bool,
}

/// A mock device. Doesn't actually play anything, but records every call so that
/// playback behavior can be inspected.
#[derive(Clone)]
pub struct Device {
    name: String,
    state: Arc<Mutex<State>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Makes subsequent play calls fail (or succeed again).
    pub fn refuse_play(&self, refuse: bool) {
        self.state.lock().refuse_play = refuse;
    }

    /// Makes binding the named clip fail.
    pub fn refuse_clip(&self, clip: &str) {
        self.state.lock().refuse_clips.insert(clip.to_string());
    }

    /// Makes loading the named clip fail.
    pub fn refuse_load(&self, clip: &str) {
        self.state.lock().refuse_loads.insert(clip.to_string());
    }

    /// Makes channel creation fail (or succeed again).
    pub fn refuse_channels(&self, refuse: bool) {
        self.state.lock().refuse_channels = refuse;
    }

    /// Advances the playback position of every playing channel.
    pub fn advance(&self, delta: Duration) {
        let mut state = self.state.lock();
        for record in state.channels.values_mut() {
            if record.playing && !record.paused {
                record.time += delta;
            }
        }
    }

    /// Simulates the named clip running out on every channel playing it.
    pub fn finish(&self, clip: &str) {
        let mut state = self.state.lock();
        for record in state.channels.values_mut() {
            if record.clip.as_ref().is_some_and(|bound| bound.name() == clip) {
                record.playing = false;
                record.paused = false;
            }
        }
    }

    /// Returns every channel ever created, in creation order.
    pub fn channels(&self) -> Vec<ChannelRecord> {
        let state = self.state.lock();
        let mut ids: Vec<&u64> = state.channels.keys().collect();
        ids.sort();
        ids.into_iter()
            .map(|id| state.channels[id].clone())
            .collect()
    }

    /// Returns the channels that have not been destroyed.
    pub fn live_channels(&self) -> Vec<ChannelRecord> {
        self.channels()
            .into_iter()
            .filter(|record| !record.destroyed)
            .collect()
    }

    /// Returns the total number of play calls across all channels.
    pub fn play_calls(&self) -> usize {
        self.state
            .lock()
            .channels
            .values()
            .map(|record| record.play_calls)
            .sum()
    }

    /// Returns the one-shots played so far.
    pub fn one_shots(&self) -> Vec<OneShot> {
        self.state.lock().one_shots.clone()
    }

    /// Returns true if the clip is currently loaded.
    pub fn is_loaded(&self, clip: &str) -> bool {
        self.state.lock().loaded.contains(&ClipRef::new(clip))
    }

    /// Returns the number of load and unload calls.
    pub fn residency_calls(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.load_calls, state.unload_calls)
    }
}

impl super::ClipProvider for Device {
    fn load(&self, clip: &ClipRef) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.load_calls += 1;
        if state.refuse_loads.contains(clip.name()) {
            return Err(BackendError::Load(
                clip.to_string(),
                "refused by mock".to_string(),
            ));
        }
        state.loaded.insert(clip.clone());
        debug!(device = self.name, clip = %clip, "Clip loaded (mock)");
        Ok(())
    }

    fn unload(&self, clip: &ClipRef) {
        let mut state = self.state.lock();
        state.unload_calls += 1;
        state.loaded.remove(clip);
        debug!(device = self.name, clip = %clip, "Clip unloaded (mock)");
    }
}

impl super::Device for Device {
    fn create_channel(&self) -> Result<Box<dyn super::ChannelBackend>, BackendError> {
        let mut state = self.state.lock();
        if state.refuse_channels {
            return Err(BackendError::ChannelUnavailable(
                "refused by mock".to_string(),
            ));
        }

        let id = state.next_channel;
        state.next_channel += 1;
        state.channels.insert(id, ChannelRecord::default());
        Ok(Box::new(Channel {
            id,
            state: self.state.clone(),
        }))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

/// A channel on the mock device.
struct Channel {
    id: u64,
    state: Arc<Mutex<State>>,
}

impl Channel {
    fn with_record<T>(&self, f: impl FnOnce(&mut ChannelRecord) -> T) -> T {
        let mut state = self.state.lock();
        f(state.channels.entry(self.id).or_default())
    }
}

impl super::ChannelBackend for Channel {
    fn set_clip(&mut self, clip: &ClipRef) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if !state.loaded.contains(clip) {
            return Err(BackendError::ClipNotLoaded(clip.to_string()));
        }
        if state.refuse_clips.contains(clip.name()) {
            return Err(BackendError::BindRefused(clip.to_string()));
        }

        let record = state.channels.entry(self.id).or_default();
        // Swapping clips stops whatever was playing.
        record.playing = false;
        record.paused = false;
        record.time = Duration::ZERO;
        record.clip = Some(clip.clone());
        Ok(())
    }

    fn clear_clip(&mut self) {
        self.with_record(|record| {
            record.clip = None;
            record.playing = false;
            record.paused = false;
        });
    }

    fn set_volume(&mut self, volume: f32) {
        self.with_record(|record| record.volume = volume);
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.with_record(|record| record.pitch = pitch);
    }

    fn set_loop(&mut self, looping: bool) {
        self.with_record(|record| record.looping = looping);
    }

    fn set_output_bus(&mut self, bus: Option<&OutputBus>) {
        self.with_record(|record| record.output_bus = bus.cloned());
    }

    fn play(&mut self) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.refuse_play {
            return Err(BackendError::PlaybackRefused("refused by mock".to_string()));
        }

        let record = state.channels.entry(self.id).or_default();
        match &record.clip {
            Some(_) => {
                record.playing = true;
                record.paused = false;
                record.play_calls += 1;
                Ok(())
            }
            None => Err(BackendError::PlaybackRefused("no clip bound".to_string())),
        }
    }

    fn play_one_shot(&mut self, clip: &ClipRef, volume: f32) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if !state.loaded.contains(clip) {
            return Err(BackendError::ClipNotLoaded(clip.to_string()));
        }
        if state.refuse_play {
            return Err(BackendError::PlaybackRefused("refused by mock".to_string()));
        }

        state.one_shots.push(OneShot {
            channel: self.id,
            clip: clip.clone(),
            volume,
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.with_record(|record| {
            if record.playing {
                record.paused = true;
            }
        });
    }

    fn resume(&mut self) {
        self.with_record(|record| record.paused = false);
    }

    fn stop(&mut self) {
        self.with_record(|record| {
            record.playing = false;
            record.paused = false;
            record.time = Duration::ZERO;
            record.stop_calls += 1;
        });
    }

    fn is_playing(&self) -> bool {
        self.with_record(|record| record.playing && !record.paused)
    }

    fn time(&self) -> Duration {
        self.with_record(|record| record.time)
    }

    fn set_time(&mut self, time: Duration) {
        self.with_record(|record| record.time = time);
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.with_record(|record| {
            record.playing = false;
            record.destroyed = true;
        });
    }
}
