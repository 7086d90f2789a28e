// Copyright (C) 2025 the stemmix authors
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
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

/// Coordinates shutdown of the transport thread. The thread parks on the
/// handle until it is cancelled (stop, teardown) or until some other wake
/// condition holds (end of song, device failure); whoever changes such a
/// condition calls [`CancelHandle::notify`].
#[derive(Clone)]
pub struct CancelHandle {
    cancelled: Arc<Mutex<bool>>,
    condvar: Arc<Condvar>,
}

impl CancelHandle {
    pub fn new() -> CancelHandle {
        CancelHandle {
            cancelled: Arc::new(Mutex::new(false)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Returns true if the operation has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock()
    }

    /// Blocks until the handle is cancelled or `wake` returns true. `wake` is
    /// re-evaluated under the handle's lock after every notification, so a
    /// flag set before [`CancelHandle::notify`] is never missed.
    pub fn wait_until<F: Fn() -> bool>(&self, wake: F) {
        let mut cancelled = self.cancelled.lock();
        self.condvar
            .wait_while(&mut cancelled, |cancelled| !*cancelled && !wake());
    }

    /// Wakes waiters so they can re-check their wake condition. Takes the
    /// handle's lock briefly, which keeps a flag-set-then-notify sequence
    /// from racing a waiter that is between its check and its sleep.
    pub fn notify(&self) {
        let _guard = self.cancelled.lock();
        self.condvar.notify_all();
    }

    /// Cancels the operation and wakes all waiters.
    pub fn cancel(&self) {
        let mut cancelled = self.cancelled.lock();
        if !*cancelled {
            *cancelled = true;
            self.condvar.notify_all();
        }
    }
}
