//! Delegate Module - Multicast Callables
//!
//! Event-style delegates holding an ordered list of handlers:
//! - `+` / `+=` append a handler or a whole delegate
//! - `-` / `-=` remove every occurrence of a handler (or of each handler of a delegate)
//! - invocation calls all handlers and yields the last result
//! - one lock per instance, chosen from a closed set of policies

pub mod error;
pub mod handler;
pub mod lock;
pub mod multicast;

pub use error::DelegateError;
pub use handler::Handler;
pub use lock::{LockGuard, LockPolicy, PolicyLock};
pub use multicast::{Delegate, Delegate0, MulticastDelegate};
