#![allow(unsafe_code)]

use core::marker::PhantomData;

use critical_section::{CriticalSection, RestoreState};

/// Scoped critical section.
///
/// Entering disables preemption and saves the previous state; dropping the
/// guard restores that state exactly once. Guards must be dropped in the
/// reverse order they were created, which holds for any guard bound to a
/// local and left to fall out of scope.
pub(crate) struct CriticalGuard {
    state: RestoreState,
    // Restore must happen on the context that acquired.
    _not_send: PhantomData<*mut ()>,
}

impl CriticalGuard {
    pub(crate) fn enter() -> Self {
        // SAFETY: paired with the `release` in `Drop`, which runs exactly once.
        let state = unsafe { critical_section::acquire() };
        Self {
            state,
            _not_send: PhantomData,
        }
    }

    /// Token for `critical_section::Mutex` access while the guard lives.
    pub(crate) fn token(&self) -> CriticalSection<'_> {
        // SAFETY: the section stays entered for the guard's lifetime.
        unsafe { CriticalSection::new() }
    }
}

impl Drop for CriticalGuard {
    fn drop(&mut self) {
        // SAFETY: `state` came from the matching `acquire` in `enter`.
        unsafe { critical_section::release(self.state) }
    }
}
