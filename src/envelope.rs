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

//! Volume envelopes.
//!
//! An envelope moves one channel's volume from a start level to an end level over
//! a fixed duration. Envelopes are plain data: the [`EnvelopeScheduler`] advances
//! them by the elapsed time on every tick, so a fade survives any number of ticks
//! without holding anything on the call stack.

mod scheduler;

use std::f32::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;

pub use scheduler::{Completion, EnvelopeScheduler};

/// The shape used to interpolate between start and end volume.
#[derive(Deserialize, Clone, Copy, Serialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// Straight line.
    #[default]
    Linear,
    /// sin(t * pi/2). Fast at first, gentle at the end.
    EqualPower,
    /// 0.5 * (1 - cos(pi * t)). Eases in and out.
    SCurve,
}

impl FadeCurve {
    /// Maps normalized progress in [0, 1] onto the curve.
    pub fn shape(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            FadeCurve::Linear => t,
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
        }
    }
}

impl fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FadeCurve::Linear => "linear",
            FadeCurve::EqualPower => "equal power",
            FadeCurve::SCurve => "s-curve",
        };
        write!(f, "{}", name)
    }
}

/// Linear interpolation between two volumes.
pub fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start + (end - start) * t
}

/// What happens to the target channel once an envelope finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnComplete {
    /// Leave the channel as it is.
    None,
    /// Stop the channel but keep it.
    StopChannel,
    /// Stop the channel and release it.
    DestroyChannel,
    /// Make the channel the new primary.
    PromoteToPrimary,
}

/// A volume transition on a single channel.
#[derive(Clone, Debug)]
pub struct Envelope {
    target: ChannelId,
    start_volume: f32,
    end_volume: f32,
    duration: Duration,
    elapsed: Duration,
    on_complete: OnComplete,
    curve: FadeCurve,
}

impl Envelope {
    /// Creates a new linear envelope.
    pub fn new(
        target: ChannelId,
        start_volume: f32,
        end_volume: f32,
        duration: Duration,
        on_complete: OnComplete,
    ) -> Envelope {
        Envelope {
            target,
            start_volume,
            end_volume,
            duration,
            elapsed: Duration::ZERO,
            on_complete,
            curve: FadeCurve::Linear,
        }
    }

    /// Sets the interpolation curve.
    pub fn with_curve(mut self, curve: FadeCurve) -> Envelope {
        self.curve = curve;
        self
    }

    pub fn target(&self) -> ChannelId {
        self.target
    }

    pub fn start_volume(&self) -> f32 {
        self.start_volume
    }

    pub fn end_volume(&self) -> f32 {
        self.end_volume
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn on_complete(&self) -> OnComplete {
        self.on_complete
    }

    /// Returns normalized progress in [0, 1]. A zero-length envelope is always done.
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0) as f32
    }

    /// Returns true once the full duration has elapsed.
    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Returns the volume at the current progress. The end volume is returned
    /// verbatim once complete.
    pub fn volume(&self) -> f32 {
        if self.is_complete() {
            return self.end_volume;
        }
        lerp(
            self.start_volume,
            self.end_volume,
            self.curve.shape(self.progress()),
        )
    }

    /// Advances the envelope and returns the new volume.
    pub fn advance(&mut self, delta: Duration) -> f32 {
        self.elapsed = self.elapsed.saturating_add(delta);
        self.volume()
    }

    /// Returns true if the envelope raises the volume.
    pub fn is_rising(&self) -> bool {
        self.end_volume > self.start_volume
    }
}
