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

//! Envelope scheduling.

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{Envelope, FadeCurve, OnComplete};
use crate::channel::{ChannelId, ChannelPool, PoolError};

/// A finished envelope and the action that was applied for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    pub target: ChannelId,
    pub action: OnComplete,
}

/// Runs active envelopes, at most one per channel.
pub struct EnvelopeScheduler {
    envelopes: HashMap<ChannelId, Envelope>,
    curve: FadeCurve,
}

impl EnvelopeScheduler {
    /// Creates a new scheduler whose envelopes use the given curve.
    pub fn new(curve: FadeCurve) -> EnvelopeScheduler {
        EnvelopeScheduler {
            envelopes: HashMap::new(),
            curve,
        }
    }

    /// Fades the target channel from its current volume to `end_volume`. An
    /// envelope already running on the channel is replaced, and the new one starts
    /// from wherever the old one left the volume. A zero duration snaps to the end
    /// volume and completes immediately.
    pub fn fade(
        &mut self,
        pool: &mut ChannelPool,
        target: ChannelId,
        end_volume: f32,
        duration: Duration,
        on_complete: OnComplete,
    ) -> Result<(), PoolError> {
        let start_volume = pool.channel(target)?.volume();
        if let Some(replaced) = self.envelopes.remove(&target) {
            debug!(
                channel = %target,
                volume = start_volume,
                replaced_end = replaced.end_volume(),
                replaced_elapsed_ms = replaced.elapsed().as_millis(),
                replaced_fade_ms = replaced.duration().as_millis(),
                "Replacing active fade"
            );
        }

        let envelope = Envelope::new(target, start_volume, end_volume, duration, on_complete)
            .with_curve(self.curve);

        if duration.is_zero() {
            warn!(channel = %target, "Fade has no duration, snapping to end volume");
            pool.channel_mut(target)?.set_volume(end_volume);
            Self::finish(pool, target, on_complete);
            return Ok(());
        }

        debug!(
            channel = %target,
            from = start_volume,
            to = end_volume,
            fade_ms = duration.as_millis(),
            "Fade scheduled"
        );
        self.envelopes.insert(target, envelope);
        Ok(())
    }

    /// Cancels the envelope on the target channel, leaving the volume where it is.
    pub fn cancel(&mut self, target: ChannelId) -> Option<Envelope> {
        let cancelled = self.envelopes.remove(&target);
        if cancelled.is_some() {
            debug!(channel = %target, "Fade cancelled");
        }
        cancelled
    }

    /// Drops every envelope.
    pub fn clear(&mut self) {
        self.envelopes.clear();
    }

    /// Returns the envelope running on the target channel.
    pub fn envelope(&self, target: ChannelId) -> Option<&Envelope> {
        self.envelopes.get(&target)
    }

    pub fn is_fading(&self, target: ChannelId) -> bool {
        self.envelopes.contains_key(&target)
    }

    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// Advances every envelope by `delta`, applies the new volumes and runs the
    /// completion action of each envelope that finished. Envelopes whose channel
    /// has been released are dropped.
    pub fn tick(&mut self, pool: &mut ChannelPool, delta: Duration) -> Vec<Completion> {
        let mut completed = Vec::new();

        self.envelopes.retain(|_, envelope| {
            let volume = envelope.advance(delta);
            match pool.get_mut(envelope.target()) {
                Some(channel) => channel.set_volume(volume),
                None => {
                    debug!(channel = %envelope.target(), "Fade target released, dropping fade");
                    return false;
                }
            }

            if envelope.is_complete() {
                completed.push(Completion {
                    target: envelope.target(),
                    action: envelope.on_complete(),
                });
                return false;
            }
            true
        });

        for completion in completed.iter() {
            Self::finish(pool, completion.target, completion.action);
        }
        completed
    }

    fn finish(pool: &mut ChannelPool, target: ChannelId, action: OnComplete) {
        match action {
            OnComplete::None => {}
            OnComplete::StopChannel => {
                if let Some(channel) = pool.get_mut(target) {
                    channel.stop();
                }
            }
            OnComplete::DestroyChannel => {
                if let Err(e) = pool.destroy(target) {
                    error!(channel = %target, err = %e, "Unable to destroy faded channel");
                }
            }
            OnComplete::PromoteToPrimary => match pool.promote(target) {
                Ok(Some(displaced)) => {
                    warn!(
                        channel = %displaced,
                        "Promotion displaced a primary channel, destroying it"
                    );
                    if let Err(e) = pool.destroy(displaced) {
                        error!(channel = %displaced, err = %e, "Unable to destroy displaced channel");
                    }
                }
                Ok(None) => {
                    info!(channel = %target, "Crossfade complete");
                }
                Err(e) => {
                    debug!(channel = %target, err = %e, "Promotion target released");
                }
            },
        }
    }
}

impl std::fmt::Debug for EnvelopeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeScheduler")
            .field("active", &self.envelopes.len())
            .field("curve", &self.curve)
            .finish()
    }
}
