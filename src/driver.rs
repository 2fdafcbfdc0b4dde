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

//! Drives the coordinator from a periodic timer.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::coordinator::PlaybackCoordinator;

/// Ticks a coordinator at a fixed rate, passing the real time elapsed since the
/// previous tick. A stall shows up as one large delta rather than a burst of
/// catch-up ticks.
pub struct TickDriver {
    interval: Interval,
    last: Instant,
    ticks: u64,
}

impl TickDriver {
    /// Creates a driver ticking `tick_rate` times per second. Must be called from
    /// within a tokio runtime.
    pub fn new(tick_rate: u32) -> TickDriver {
        let period = Duration::from_secs_f64(1.0 / f64::from(tick_rate.max(1)));
        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        TickDriver {
            interval,
            last: Instant::now(),
            ticks: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    /// Returns the number of ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Waits for the next tick and advances the coordinator. Returns the delta the
    /// coordinator was ticked with.
    pub async fn tick(&mut self, coordinator: &mut PlaybackCoordinator) -> Duration {
        self.interval.tick().await;
        let now = Instant::now();
        let delta = now.duration_since(self.last);
        self.last = now;
        self.ticks += 1;

        for completion in coordinator.tick(delta) {
            debug!(
                channel = %completion.target,
                action = ?completion.action,
                tick = self.ticks,
                "Fade completed"
            );
        }
        delta
    }

    /// Ticks the coordinator until no fades are running.
    pub async fn settle(&mut self, coordinator: &mut PlaybackCoordinator) {
        while coordinator.active_fades() > 0 {
            self.tick(coordinator).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::mock;
    use crate::coordinator::Settings;
    use crate::sound::{ClipRef, SoundAsset};

    #[tokio::test(flavor = "multi_thread")]
    async fn test_driver_completes_fades() {
        let device = mock::Device::get("mock");
        let mut coordinator =
            PlaybackCoordinator::init(Arc::new(device.clone()), Settings::default()).unwrap();
        coordinator
            .register_sounds([
                SoundAsset::new("theme", vec![ClipRef::new("theme.ogg")]).with_volume(0.8)
            ])
            .unwrap();
        coordinator
            .play("theme", Duration::ZERO, Duration::from_millis(30))
            .unwrap();

        let mut driver = TickDriver::new(200);
        assert_eq!(driver.period(), Duration::from_millis(5));

        let mut elapsed = Duration::ZERO;
        while coordinator.active_fades() > 0 {
            elapsed += driver.tick(&mut coordinator).await;
        }
        assert!(elapsed >= Duration::from_millis(30));
        assert!(driver.ticks() > 1);
        assert_eq!(device.channels()[0].volume, 0.8);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_settle() {
        let device = mock::Device::get("mock");
        let mut coordinator =
            PlaybackCoordinator::init(Arc::new(device.clone()), Settings::default()).unwrap();
        coordinator.stop(Duration::from_millis(20)).unwrap();

        let mut driver = TickDriver::new(500);
        driver.settle(&mut coordinator).await;
        assert_eq!(coordinator.live_channels(), 0);
    }
}
