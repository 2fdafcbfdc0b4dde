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

//! Channel ownership.
//!
//! The pool owns every live channel. One of them may be registered as the
//! primary channel, the single "active output" for sustained playback. During a
//! crossfade the channel being faded in is registered as incoming until it's
//! promoted. Every other channel is ephemeral and must eventually be destroyed.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{Channel, ChannelId};
use crate::backend::{BackendError, Device};
use crate::sound::SoundAsset;

/// Default maximum number of live channels, primary included.
pub const DEFAULT_MAX_CHANNELS: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("channel pool exhausted ({max} channels in use)")]
    Exhausted { max: usize },

    #[error("channel {0} has been released")]
    UnknownChannel(ChannelId),

    #[error("channel {0} is the primary channel and must be detached first")]
    ChannelIsPrimary(ChannelId),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Owns and lends out playback channels.
pub struct ChannelPool {
    device: Arc<dyn Device>,
    channels: HashMap<ChannelId, Channel>,
    primary: Option<ChannelId>,
    incoming: Option<ChannelId>,
    max_channels: usize,
    next_id: u64,
}

impl ChannelPool {
    /// Creates a new, empty pool.
    pub fn new(device: Arc<dyn Device>, max_channels: usize) -> ChannelPool {
        ChannelPool {
            device,
            channels: HashMap::new(),
            primary: None,
            incoming: None,
            max_channels: max_channels.max(1),
            next_id: 1,
        }
    }

    fn create(&mut self) -> Result<ChannelId, PoolError> {
        if self.channels.len() >= self.max_channels {
            warn!(max_channels = self.max_channels, "Channel pool exhausted");
            return Err(PoolError::Exhausted {
                max: self.max_channels,
            });
        }

        let backend = self.device.create_channel()?;
        let id = ChannelId::new(self.next_id);
        self.next_id += 1;
        self.channels.insert(id, Channel::new(id, backend));
        debug!(channel = %id, live = self.channels.len(), "Channel created");
        Ok(id)
    }

    /// Returns the primary channel, creating one if there is none.
    pub fn acquire_primary(&mut self) -> Result<ChannelId, PoolError> {
        if let Some(primary) = self.primary {
            return Ok(primary);
        }

        let id = self.create()?;
        self.primary = Some(id);
        debug!(channel = %id, "Primary channel acquired");
        Ok(id)
    }

    /// Creates a channel that isn't tracked as primary.
    pub fn acquire_ephemeral(&mut self) -> Result<ChannelId, PoolError> {
        self.create()
    }

    /// Returns the primary channel id.
    pub fn primary(&self) -> Option<ChannelId> {
        self.primary
    }

    /// Returns the channel waiting to be promoted to primary.
    pub fn incoming(&self) -> Option<ChannelId> {
        self.incoming
    }

    /// Marks a channel as the one that will replace the primary.
    pub fn set_incoming(&mut self, id: ChannelId) -> Result<(), PoolError> {
        if !self.channels.contains_key(&id) {
            return Err(PoolError::UnknownChannel(id));
        }
        if let Some(previous) = self.incoming.replace(id) {
            if previous != id {
                warn!(channel = %previous, "Replacing incoming channel before promotion");
            }
        }
        Ok(())
    }

    /// Makes the given channel the primary. Returns the old primary, now detached,
    /// so the caller can fade or destroy it.
    pub fn promote(&mut self, id: ChannelId) -> Result<Option<ChannelId>, PoolError> {
        if !self.channels.contains_key(&id) {
            return Err(PoolError::UnknownChannel(id));
        }
        if self.incoming == Some(id) {
            self.incoming = None;
        }
        if self.primary == Some(id) {
            return Ok(None);
        }

        let previous = self.primary.replace(id);
        info!(channel = %id, "Channel promoted to primary");
        Ok(previous)
    }

    /// Detaches the primary channel so it can be faded out and destroyed on its
    /// own. The pool has no primary afterwards.
    pub fn detach_primary(&mut self) -> Option<ChannelId> {
        let detached = self.primary.take();
        if let Some(id) = detached {
            debug!(channel = %id, "Primary channel detached");
        }
        detached
    }

    /// Stops and destroys a channel, releasing its device resources. The primary
    /// channel can't be destroyed until it's detached.
    pub fn destroy(&mut self, id: ChannelId) -> Result<(), PoolError> {
        if self.primary == Some(id) {
            return Err(PoolError::ChannelIsPrimary(id));
        }

        let mut channel = self
            .channels
            .remove(&id)
            .ok_or(PoolError::UnknownChannel(id))?;
        if self.incoming == Some(id) {
            self.incoming = None;
        }
        channel.unbind();
        debug!(channel = %id, live = self.channels.len(), "Channel destroyed");
        Ok(())
    }

    /// Destroys every channel, primary included.
    pub fn clear(&mut self) {
        self.primary = None;
        self.incoming = None;
        for (_, mut channel) in self.channels.drain() {
            channel.unbind();
        }
    }

    pub fn get(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn get_mut(&mut self, id: ChannelId) -> Option<&mut Channel> {
        self.channels.get_mut(&id)
    }

    /// Returns the channel, or an error if it has been released.
    pub fn channel(&self, id: ChannelId) -> Result<&Channel, PoolError> {
        self.channels.get(&id).ok_or(PoolError::UnknownChannel(id))
    }

    /// Returns the channel mutably, or an error if it has been released.
    pub fn channel_mut(&mut self, id: ChannelId) -> Result<&mut Channel, PoolError> {
        self.channels
            .get_mut(&id)
            .ok_or(PoolError::UnknownChannel(id))
    }

    /// Returns the ids of all channels bound to the given sound.
    pub fn bound_to(&self, sound: &SoundAsset) -> Vec<ChannelId> {
        let mut ids: Vec<ChannelId> = self
            .channels
            .values()
            .filter(|channel| channel.is_bound_to(sound))
            .map(Channel::id)
            .collect();
        ids.sort();
        ids
    }

    /// Returns the number of live channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn max_channels(&self) -> usize {
        self.max_channels
    }
}

impl std::fmt::Debug for ChannelPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPool")
            .field("live_channels", &self.channels.len())
            .field("max_channels", &self.max_channels)
            .field("primary", &self.primary)
            .field("incoming", &self.incoming)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock;

    fn create_pool(max_channels: usize) -> (mock::Device, ChannelPool) {
        let device = mock::Device::get("mock");
        let pool = ChannelPool::new(Arc::new(device.clone()), max_channels);
        (device, pool)
    }

    #[test]
    fn test_acquire_primary_is_stable() {
        let (device, mut pool) = create_pool(4);
        let first = pool.acquire_primary().expect("primary");
        let second = pool.acquire_primary().expect("primary");
        assert_eq!(first, second);
        assert_eq!(pool.len(), 1);
        assert_eq!(device.live_channels().len(), 1);
    }

    #[test]
    fn test_ephemeral_channels_are_distinct() {
        let (_device, mut pool) = create_pool(4);
        let primary = pool.acquire_primary().expect("primary");
        let a = pool.acquire_ephemeral().expect("ephemeral");
        let b = pool.acquire_ephemeral().expect("ephemeral");
        assert_ne!(a, b);
        assert_ne!(a, primary);
        assert_eq!(pool.primary(), Some(primary));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_exhausted() {
        let (_device, mut pool) = create_pool(2);
        pool.acquire_primary().expect("primary");
        pool.acquire_ephemeral().expect("ephemeral");
        assert!(matches!(
            pool.acquire_ephemeral(),
            Err(PoolError::Exhausted { max: 2 })
        ));
    }

    #[test]
    fn test_destroy_refuses_primary() {
        let (device, mut pool) = create_pool(4);
        let primary = pool.acquire_primary().expect("primary");
        assert!(matches!(
            pool.destroy(primary),
            Err(PoolError::ChannelIsPrimary(id)) if id == primary
        ));

        assert_eq!(pool.detach_primary(), Some(primary));
        assert!(pool.destroy(primary).is_ok());
        assert!(pool.is_empty());
        assert!(device.channels()[0].destroyed);

        // Released channels can't be operated on.
        assert!(matches!(
            pool.destroy(primary),
            Err(PoolError::UnknownChannel(_))
        ));
        assert!(pool.channel_mut(primary).is_err());
    }

    #[test]
    fn test_promote_returns_old_primary() {
        let (_device, mut pool) = create_pool(4);
        let old = pool.acquire_primary().expect("primary");
        let new = pool.acquire_ephemeral().expect("ephemeral");
        pool.set_incoming(new).expect("incoming");

        assert_eq!(pool.promote(new).expect("promote"), Some(old));
        assert_eq!(pool.primary(), Some(new));
        assert_eq!(pool.incoming(), None);

        // Promoting the primary again is a no-op.
        assert_eq!(pool.promote(new).expect("promote"), None);
        assert!(pool.destroy(old).is_ok());
    }

    #[test]
    fn test_channel_creation_failure() {
        let (device, mut pool) = create_pool(4);
        device.refuse_channels(true);
        assert!(matches!(
            pool.acquire_primary(),
            Err(PoolError::Backend(BackendError::ChannelUnavailable(_)))
        ));
        assert_eq!(pool.primary(), None);

        device.refuse_channels(false);
        assert!(pool.acquire_primary().is_ok());
    }

    #[test]
    fn test_clear_destroys_everything() {
        let (device, mut pool) = create_pool(4);
        pool.acquire_primary().expect("primary");
        pool.acquire_ephemeral().expect("ephemeral");
        pool.clear();
        assert!(pool.is_empty());
        assert_eq!(pool.primary(), None);
        assert!(device.live_channels().is_empty());
    }
}
