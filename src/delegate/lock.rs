//! Lock Policies
//!
//! A delegate owns exactly one lock, chosen at construction time from a
//! closed set of policies. The lock guards no data of its own: it serializes
//! the read-modify-store cycle of list mutations.

use std::fmt;
use std::sync::PoisonError;

use tracing::debug;

/// Mutual-exclusion strategy used by a delegate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockPolicy {
    /// Lightweight in-process exclusive section (spins briefly, then parks)
    #[default]
    CriticalSection,
    /// Operating-system mutex
    Mutex,
    /// No exclusion; only sound for single-threaded mutation
    NoLock,
}

/// The concrete lock instance owned by one delegate
pub enum PolicyLock {
    CriticalSection(parking_lot::Mutex<()>),
    Mutex(std::sync::Mutex<()>),
    NoLock,
}

/// Scoped acquisition of a [`PolicyLock`]; released on drop
pub enum LockGuard<'a> {
    CriticalSection(parking_lot::MutexGuard<'a, ()>),
    Mutex(std::sync::MutexGuard<'a, ()>),
    NoLock,
}

impl PolicyLock {
    /// Allocate a fresh lock for the given policy
    pub fn new(policy: LockPolicy) -> Self {
        debug!(?policy, "allocating delegate lock");
        match policy {
            LockPolicy::CriticalSection => PolicyLock::CriticalSection(parking_lot::Mutex::new(())),
            LockPolicy::Mutex => PolicyLock::Mutex(std::sync::Mutex::new(())),
            LockPolicy::NoLock => PolicyLock::NoLock,
        }
    }

    /// Policy this lock was created from
    pub fn policy(&self) -> LockPolicy {
        match self {
            PolicyLock::CriticalSection(_) => LockPolicy::CriticalSection,
            PolicyLock::Mutex(_) => LockPolicy::Mutex,
            PolicyLock::NoLock => LockPolicy::NoLock,
        }
    }

    /// Block until the lock is held. `NoLock` returns immediately.
    ///
    /// Not re-entrant: acquiring twice from the same thread deadlocks for the
    /// blocking policies.
    pub fn acquire(&self) -> LockGuard<'_> {
        match self {
            PolicyLock::CriticalSection(m) => LockGuard::CriticalSection(m.lock()),
            // Guards `()`: poisoning is ignored
            PolicyLock::Mutex(m) => {
                LockGuard::Mutex(m.lock().unwrap_or_else(PoisonError::into_inner))
            }
            PolicyLock::NoLock => LockGuard::NoLock,
        }
    }
}

impl Default for PolicyLock {
    fn default() -> Self {
        PolicyLock::new(LockPolicy::default())
    }
}

impl fmt::Debug for PolicyLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PolicyLock").field(&self.policy()).finish()
    }
}

impl fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LockGuard::CriticalSection(_) => "CriticalSection",
            LockGuard::Mutex(_) => "Mutex",
            LockGuard::NoLock => "NoLock",
        };
        f.debug_tuple("LockGuard").field(&name).finish()
    }
}
