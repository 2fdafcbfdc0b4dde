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
use crate::backend::BackendError;
use crate::channel::PoolError;

/// Errors returned by coordinator operations. None of them are fatal: the
/// coordinator stays usable after any of them.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("unknown sound {0}")]
    UnknownSound(String),

    #[error("sound {0} has no clips")]
    NoClips(String),

    #[error("unknown sound bank {0}")]
    UnknownBank(String),

    #[error("no primary channel")]
    NoPrimary,

    #[error("coordinator has been shut down")]
    ShutDown,

    #[error("channel error: {0}")]
    Pool(#[from] PoolError),

    #[error("device error: {0}")]
    Backend(#[from] BackendError),
}
