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

//! The playback coordinator.
//!
//! This is the façade gameplay and UI code talks to. It owns the registry of named
//! sounds, the channel pool and the envelope scheduler, and it is the only thing
//! that decides which channel is primary. Everything is synchronous: fades are
//! scheduled as envelopes and advanced by [`PlaybackCoordinator::tick`], which the
//! host calls once per frame.
//!
//! The coordinator is not internally synchronized. It is `Send`, so it can be
//! moved to the thread that drives it, or wrapped in a mutex if several threads
//! need to issue commands.

mod error;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::backend::{BackendError, ClipProvider, Device};
use crate::channel::{
    Channel, ChannelId, ChannelPool, ChannelState, PoolError, DEFAULT_MAX_CHANNELS,
};
use crate::envelope::{Completion, EnvelopeScheduler, FadeCurve, OnComplete};
use crate::sound::{ClipRef, ClipSelector, SoundAsset};

pub use error::CoordinatorError;

/// Coordinator settings.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Maximum number of live channels, primary included.
    pub max_channels: usize,
    /// The curve every fade is shaped with.
    pub fade_curve: FadeCurve,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_channels: DEFAULT_MAX_CHANNELS,
            fade_curve: FadeCurve::default(),
        }
    }
}

/// The state of the primary playback slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// A primary channel exists but isn't playing.
    Idle,
    Playing,
    Paused,
    /// The primary is playing and its volume is rising.
    FadingIn,
    /// There's no primary; the last one is fading out.
    FadingOut,
    /// A new channel is fading in to replace the primary.
    Crossfading,
    /// There's no primary and nothing is fading.
    Released,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotState::Idle => "idle",
            SlotState::Playing => "playing",
            SlotState::Paused => "paused",
            SlotState::FadingIn => "fading in",
            SlotState::FadingOut => "fading out",
            SlotState::Crossfading => "crossfading",
            SlotState::Released => "released",
        };
        write!(f, "{}", name)
    }
}

/// Coordinates sound playback over a pool of channels.
pub struct PlaybackCoordinator {
    device: Arc<dyn Device>,
    /// Registered sounds by id.
    sounds: HashMap<String, Arc<SoundAsset>>,
    /// Loaded banks and the sound ids they registered.
    banks: HashMap<String, Vec<String>>,
    /// Clip residency reference counts. Clips shared between sounds stay loaded
    /// until the last sound using them is unregistered.
    clip_refs: HashMap<ClipRef, usize>,
    pool: ChannelPool,
    scheduler: EnvelopeScheduler,
    selector: ClipSelector,
    shut_down: bool,
}

impl PlaybackCoordinator {
    /// Initializes a coordinator on the given device. The primary channel is
    /// created up front.
    pub fn init(
        device: Arc<dyn Device>,
        settings: Settings,
    ) -> Result<PlaybackCoordinator, CoordinatorError> {
        let mut pool = ChannelPool::new(device.clone(), settings.max_channels);
        let primary = pool.acquire_primary()?;

        info!(
            device = %device,
            channel = %primary,
            max_channels = pool.max_channels(),
            curve = %settings.fade_curve,
            "Playback coordinator initialized"
        );

        Ok(PlaybackCoordinator {
            device,
            sounds: HashMap::new(),
            banks: HashMap::new(),
            clip_refs: HashMap::new(),
            pool,
            scheduler: EnvelopeScheduler::new(settings.fade_curve),
            selector: ClipSelector::new(),
            shut_down: false,
        })
    }

    /// Advances all fades by `delta`. Call once per frame.
    pub fn tick(&mut self, delta: Duration) -> Vec<Completion> {
        if self.shut_down {
            return Vec::new();
        }
        self.scheduler.tick(&mut self.pool, delta)
    }

    /// Stops and releases every channel, unregisters every sound and unloads all
    /// clip data. Every later operation fails with [`CoordinatorError::ShutDown`].
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }

        self.scheduler.clear();
        self.pool.clear();
        let ids: Vec<String> = self.sounds.keys().cloned().collect();
        self.unregister_sounds(ids);
        self.banks.clear();
        self.shut_down = true;

        info!(device = %self.device, "Playback coordinator shut down");
    }

    fn ensure_running(&self) -> Result<(), CoordinatorError> {
        if self.shut_down {
            return Err(CoordinatorError::ShutDown);
        }
        Ok(())
    }

    /// Registers sounds, loading their clip data. Registering the same sound
    /// twice is a no-op. A different sound with an existing id replaces the old
    /// one, which is unregistered first. If some clip data can't be loaded, that
    /// sound is skipped, the rest are still registered and the first error is
    /// returned.
    pub fn register_sounds<I>(&mut self, sounds: I) -> Result<(), CoordinatorError>
    where
        I: IntoIterator,
        I::Item: Into<Arc<SoundAsset>>,
    {
        self.ensure_running()?;

        let mut first_error = None;
        for sound in sounds {
            if let Err(e) = self.register(sound.into()) {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn register(&mut self, sound: Arc<SoundAsset>) -> Result<(), CoordinatorError> {
        let id = sound.id().to_string();
        if let Some(existing) = self.sounds.get(&id) {
            if Arc::ptr_eq(existing, &sound) {
                debug!(sound = %id, "Sound already registered");
                return Ok(());
            }
            warn!(sound = %id, "Sound id already registered, replacing");
            self.unregister(&id);
        }

        let mut retained = Vec::new();
        for clip in sound.clips() {
            if let Err(e) = self.retain_clip(clip) {
                error!(sound = %id, clip = %clip, err = %e, "Unable to load clip");
                for clip in retained {
                    self.release_clip(clip);
                }
                return Err(e.into());
            }
            retained.push(clip);
        }

        debug!(sound = %id, clips = sound.clips().len(), "Sound registered");
        self.sounds.insert(id, sound);
        Ok(())
    }

    /// Unregisters sounds by id. Any channel bound to an unregistered sound is
    /// stopped and released; if that was the primary, the coordinator is left
    /// without one until the next play. Unknown ids are ignored. Returns the
    /// number of sounds removed.
    pub fn unregister_sounds<I, S>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .filter(|id| self.unregister(id.as_ref()))
            .count()
    }

    fn unregister(&mut self, id: &str) -> bool {
        let sound = match self.sounds.remove(id) {
            Some(sound) => sound,
            None => {
                debug!(sound = id, "Sound not registered, nothing to unregister");
                return false;
            }
        };

        for channel in self.pool.bound_to(&sound) {
            self.scheduler.cancel(channel);
            if self.pool.primary() == Some(channel) {
                info!(sound = id, channel = %channel, "Sound owned the primary channel, stopping it");
                self.pool.detach_primary();
            }
            if let Err(e) = self.pool.destroy(channel) {
                warn!(sound = id, channel = %channel, err = %e, "Unable to release channel");
            }
        }

        for clip in sound.clips() {
            self.release_clip(clip);
        }

        debug!(sound = id, "Sound unregistered");
        true
    }

    fn retain_clip(&mut self, clip: &ClipRef) -> Result<(), BackendError> {
        match self.clip_refs.get_mut(clip) {
            Some(count) => *count += 1,
            None => {
                self.device.load(clip)?;
                self.clip_refs.insert(clip.clone(), 1);
            }
        }
        Ok(())
    }

    fn release_clip(&mut self, clip: &ClipRef) {
        match self.clip_refs.get_mut(clip) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                self.clip_refs.remove(clip);
                self.device.unload(clip);
            }
            None => {}
        }
    }

    /// Registers a named bank of sounds. Loading a bank that is already loaded is a
    /// no-op.
    pub fn load_bank<I>(&mut self, name: &str, sounds: I) -> Result<(), CoordinatorError>
    where
        I: IntoIterator,
        I::Item: Into<Arc<SoundAsset>>,
    {
        self.ensure_running()?;
        if self.banks.contains_key(name) {
            debug!(bank = name, "Bank already loaded");
            return Ok(());
        }

        let sounds: Vec<Arc<SoundAsset>> = sounds.into_iter().map(Into::into).collect();
        let ids: Vec<String> = sounds.iter().map(|sound| sound.id().to_string()).collect();
        let result = self.register_sounds(sounds);

        info!(bank = name, sounds = ids.len(), "Sound bank loaded");
        self.banks.insert(name.to_string(), ids);
        result
    }

    /// Unregisters every sound a bank registered.
    pub fn unload_bank(&mut self, name: &str) -> Result<(), CoordinatorError> {
        let ids = match self.banks.remove(name) {
            Some(ids) => ids,
            None => {
                warn!(bank = name, "Sound bank not loaded");
                return Err(CoordinatorError::UnknownBank(name.to_string()));
            }
        };

        let removed = self.unregister_sounds(ids);
        info!(bank = name, sounds = removed, "Sound bank unloaded");
        Ok(())
    }

    fn lookup(&self, id: &str) -> Result<Arc<SoundAsset>, CoordinatorError> {
        self.ensure_running()?;
        match self.sounds.get(id) {
            Some(sound) => Ok(sound.clone()),
            None => {
                warn!(sound = id, "Sound not found");
                Err(CoordinatorError::UnknownSound(id.to_string()))
            }
        }
    }

    /// Chooses the sound's next clip. The choice is only recorded on the sound
    /// once the clip is bound.
    fn pick_clip(&self, sound: &SoundAsset) -> Result<(usize, ClipRef), CoordinatorError> {
        self.selector
            .pick(sound)
            .and_then(|index| sound.clip(index).cloned().map(|clip| (index, clip)))
            .ok_or_else(|| CoordinatorError::NoClips(sound.id().to_string()))
    }

    /// Returns the primary channel. A crossfade that's still fading in is
    /// completed early so that the incoming channel is the one operated on.
    fn settle_primary(&mut self) -> Option<ChannelId> {
        if let Some(incoming) = self.pool.incoming() {
            info!(channel = %incoming, "Completing pending crossfade early");
            match self.pool.promote(incoming) {
                Ok(Some(displaced)) => {
                    self.scheduler.cancel(displaced);
                    if let Err(e) = self.pool.destroy(displaced) {
                        warn!(channel = %displaced, err = %e, "Unable to release displaced channel");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(channel = %incoming, err = %e, "Unable to promote incoming channel"),
            }
        }
        self.pool.primary()
    }

    /// Plays a sound on the primary channel, seeking to `start_time`. A non-zero
    /// `fade` fades the sound in from silence. If the primary is already playing
    /// this sound, nothing happens.
    pub fn play(
        &mut self,
        id: &str,
        start_time: Duration,
        fade: Duration,
    ) -> Result<(), CoordinatorError> {
        let sound = self.lookup(id)?;
        let (index, clip) = self.pick_clip(&sound)?;
        let primary = match self.settle_primary() {
            Some(primary) => primary,
            None => self.pool.acquire_primary()?,
        };

        let channel = self.pool.channel(primary)?;
        if channel.is_playing() && channel.is_bound_to(&sound) {
            debug!(sound = id, channel = %primary, "Sound already playing");
            return Ok(());
        }

        self.scheduler.cancel(primary);
        let channel = self.pool.channel_mut(primary)?;
        channel
            .bind(&sound, &clip)
            .inspect_err(|e| error!(sound = id, clip = %clip, err = %e, "Unable to bind clip"))?;
        channel.set_time(start_time);
        if !fade.is_zero() {
            channel.set_volume(0.0);
        }
        channel
            .play()
            .inspect_err(|e| error!(sound = id, clip = %clip, err = %e, "Unable to play sound"))?;
        sound.record_selection(index);

        if !fade.is_zero() {
            self.scheduler
                .fade(&mut self.pool, primary, sound.volume(), fade, OnComplete::None)?;
        }

        info!(
            sound = id,
            clip = %clip,
            channel = %primary,
            start_ms = start_time.as_millis(),
            fade_ms = fade.as_millis(),
            "Playing sound"
        );
        Ok(())
    }

    /// Plays a clip of the sound once over whatever the primary channel is doing.
    /// The primary's binding is untouched and one-shots may overlap.
    pub fn play_one_shot(&mut self, id: &str) -> Result<(), CoordinatorError> {
        let sound = self.lookup(id)?;
        let (index, clip) = self.pick_clip(&sound)?;
        let target = match self.pool.primary().or(self.pool.incoming()) {
            Some(target) => target,
            None => self.pool.acquire_primary()?,
        };

        self.pool
            .channel_mut(target)?
            .play_one_shot(&clip, sound.volume())
            .inspect_err(|e| error!(sound = id, clip = %clip, err = %e, "Unable to play one-shot"))?;
        sound.record_selection(index);

        debug!(sound = id, clip = %clip, channel = %target, "One-shot played");
        Ok(())
    }

    /// Pauses the primary channel if it's playing, otherwise resumes it. Returns
    /// true if the channel is now paused.
    pub fn pause_toggle(&mut self) -> Result<bool, CoordinatorError> {
        self.ensure_running()?;
        let primary = self.settle_primary().ok_or(CoordinatorError::NoPrimary)?;
        self.pause_toggle_channel(primary)
    }

    /// Pauses or resumes a specific channel. Returns true if the channel is now
    /// paused.
    pub fn pause_toggle_channel(&mut self, id: ChannelId) -> Result<bool, CoordinatorError> {
        self.ensure_running()?;
        let channel = self.pool.channel_mut(id)?;
        if channel.is_playing() {
            channel.pause();
            info!(channel = %id, "Paused");
            Ok(true)
        } else {
            if channel.resume() {
                info!(channel = %id, "Resumed");
            }
            Ok(false)
        }
    }

    /// Stops the primary channel. With no fade it stops immediately. Otherwise the
    /// primary is detached and faded out on its own, and the coordinator has no
    /// primary until the next play.
    pub fn stop(&mut self, fade: Duration) -> Result<(), CoordinatorError> {
        self.ensure_running()?;
        let primary = match self.settle_primary() {
            Some(primary) => primary,
            None => {
                debug!("Nothing to stop");
                return Ok(());
            }
        };

        if fade.is_zero() {
            self.scheduler.cancel(primary);
            self.pool.channel_mut(primary)?.stop();
            info!(channel = %primary, "Stopped");
            return Ok(());
        }

        self.pool.detach_primary();
        self.scheduler
            .fade(&mut self.pool, primary, 0.0, fade, OnComplete::DestroyChannel)?;
        info!(channel = %primary, fade_ms = fade.as_millis(), "Fading out");
        Ok(())
    }

    /// Fades the primary channel to `volume` over `duration`. A fade already
    /// running on the primary is replaced from the current volume.
    pub fn fade_volume(&mut self, volume: f32, duration: Duration) -> Result<(), CoordinatorError> {
        self.ensure_running()?;
        let primary = self.settle_primary().ok_or(CoordinatorError::NoPrimary)?;
        self.fade_volume_channel(primary, volume, duration)
    }

    /// Fades a specific channel to `volume` over `duration`, replacing any fade
    /// running on it. The channel is left playing at the new volume.
    pub fn fade_volume_channel(
        &mut self,
        id: ChannelId,
        volume: f32,
        duration: Duration,
    ) -> Result<(), CoordinatorError> {
        self.ensure_running()?;
        let target = volume.clamp(0.0, 1.0);
        if target != volume {
            warn!(channel = %id, volume, "Fade volume out of range, clamping");
        }

        self.scheduler
            .fade(&mut self.pool, id, target, duration, OnComplete::None)?;
        info!(channel = %id, volume = target, fade_ms = duration.as_millis(), "Fading volume");
        Ok(())
    }

    /// Crossfades from the primary channel to the given sound. The new sound
    /// starts on a fresh channel at the primary's playback position and fades in
    /// over `fade_in`, becoming primary the moment it finishes. The old primary
    /// fades out over `fade_out` and is released. The two fades run independently.
    pub fn crossfade_to(
        &mut self,
        id: &str,
        fade_out: Duration,
        fade_in: Duration,
    ) -> Result<(), CoordinatorError> {
        let sound = self.lookup(id)?;
        let (index, clip) = self.pick_clip(&sound)?;

        // Settling a pending crossfade releases the channel it displaces.
        let reclaimed =
            usize::from(self.pool.incoming().is_some() && self.pool.primary().is_some());
        if self.pool.len() - reclaimed >= self.pool.max_channels() {
            warn!(sound = id, max = self.pool.max_channels(), "No channel free for crossfade");
            return Err(PoolError::Exhausted {
                max: self.pool.max_channels(),
            }
            .into());
        }

        let outgoing = self.settle_primary();
        let position = outgoing
            .and_then(|outgoing| self.pool.get(outgoing))
            .map(Channel::time)
            .unwrap_or_default();

        let incoming = self.pool.acquire_ephemeral()?;
        if let Err(e) = self.start_silent(incoming, &sound, &clip, position) {
            error!(sound = id, clip = %clip, err = %e, "Unable to start crossfade");
            if let Err(e) = self.pool.destroy(incoming) {
                warn!(channel = %incoming, err = %e, "Unable to release channel");
            }
            return Err(e);
        }
        sound.record_selection(index);

        if let Some(outgoing) = outgoing {
            self.pool.detach_primary();
            self.scheduler.fade(
                &mut self.pool,
                outgoing,
                0.0,
                fade_out,
                OnComplete::DestroyChannel,
            )?;
        }

        self.pool.set_incoming(incoming)?;
        self.scheduler.fade(
            &mut self.pool,
            incoming,
            sound.volume(),
            fade_in,
            OnComplete::PromoteToPrimary,
        )?;

        info!(
            sound = id,
            clip = %clip,
            from = ?outgoing,
            to = %incoming,
            position_ms = position.as_millis(),
            fade_out_ms = fade_out.as_millis(),
            fade_in_ms = fade_in.as_millis(),
            "Crossfading"
        );
        Ok(())
    }

    fn start_silent(
        &mut self,
        id: ChannelId,
        sound: &Arc<SoundAsset>,
        clip: &ClipRef,
        position: Duration,
    ) -> Result<(), CoordinatorError> {
        let channel = self.pool.channel_mut(id)?;
        channel.bind(sound, clip)?;
        channel.set_time(position);
        channel.set_volume(0.0);
        channel.play()?;
        Ok(())
    }

    /// Sets the clip a manually selected sound plays next.
    pub fn set_clip_index(&mut self, id: &str, index: usize) -> Result<bool, CoordinatorError> {
        Ok(self.lookup(id)?.set_clip_index(index))
    }

    /// Returns the primary channel id.
    pub fn primary(&self) -> Option<ChannelId> {
        self.pool.primary()
    }

    /// Returns the channel currently fading in to replace the primary.
    pub fn incoming(&self) -> Option<ChannelId> {
        self.pool.incoming()
    }

    /// Returns the sound bound to the primary channel.
    pub fn primary_sound(&self) -> Option<Arc<SoundAsset>> {
        self.pool
            .primary()
            .and_then(|id| self.pool.get(id))
            .and_then(Channel::sound)
    }

    /// Returns the primary channel's playback position.
    pub fn timestamp(&self) -> Option<Duration> {
        self.pool
            .primary()
            .and_then(|id| self.pool.get(id))
            .map(Channel::time)
    }

    /// Returns a live channel.
    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.pool.get(id)
    }

    /// Returns the registered sound with the given id.
    pub fn sound(&self, id: &str) -> Option<Arc<SoundAsset>> {
        self.sounds.get(id).cloned()
    }

    /// Returns all registered sounds, sorted by id.
    pub fn sounds(&self) -> Vec<Arc<SoundAsset>> {
        let mut sounds: Vec<Arc<SoundAsset>> = self.sounds.values().cloned().collect();
        sounds.sort_by(|a, b| a.id().cmp(b.id()));
        sounds
    }

    /// Returns true if a fade is running on the channel.
    pub fn is_fading(&self, id: ChannelId) -> bool {
        self.scheduler.is_fading(id)
    }

    /// Returns the number of running fades.
    pub fn active_fades(&self) -> usize {
        self.scheduler.len()
    }

    /// Returns the number of live channels.
    pub fn live_channels(&self) -> usize {
        self.pool.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Returns the state of the primary playback slot.
    pub fn slot_state(&self) -> SlotState {
        if self.shut_down {
            return SlotState::Released;
        }
        if self.pool.incoming().is_some() {
            return SlotState::Crossfading;
        }

        match self.pool.primary().and_then(|id| self.pool.get(id)) {
            Some(channel) => match channel.state() {
                ChannelState::Idle => SlotState::Idle,
                ChannelState::Paused => SlotState::Paused,
                ChannelState::Playing => match self.scheduler.envelope(channel.id()) {
                    Some(envelope) if envelope.is_rising() => SlotState::FadingIn,
                    Some(_) => SlotState::FadingOut,
                    None => SlotState::Playing,
                },
            },
            None if !self.scheduler.is_empty() => SlotState::FadingOut,
            None => SlotState::Released,
        }
    }
}

impl fmt::Debug for PlaybackCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackCoordinator")
            .field("device", &self.device.to_string())
            .field("sounds", &self.sounds.len())
            .field("banks", &self.banks.len())
            .field("pool", &self.pool)
            .field("scheduler", &self.scheduler)
            .field("slot", &self.slot_state())
            .finish()
    }
}
