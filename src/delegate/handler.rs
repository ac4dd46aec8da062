//! Shared callables stored by a delegate.

use std::fmt;
use std::sync::Arc;

/// A shared callable taking `A` and returning `R`.
///
/// Handlers compare by identity: clones of one handler are equal to each
/// other, while two handlers built from identical closures are not. Handlers
/// made with [`Handler::from_fn`] compare by function address, so wrapping
/// the same `fn` twice yields equal handlers.
pub struct Handler<A, R> {
    func: Arc<dyn Fn(A) -> R + Send + Sync>,
    /// Address of the wrapped `fn`, for handlers built from one
    fn_addr: Option<usize>,
}

impl<A, R> Handler<A, R> {
    /// Wrap a closure
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Handler {
            func: Arc::new(f),
            fn_addr: None,
        }
    }

    /// Wrap a plain function pointer
    pub fn from_fn(f: fn(A) -> R) -> Self
    where
        A: 'static,
        R: 'static,
    {
        Handler {
            func: Arc::new(f),
            fn_addr: Some(f as usize),
        }
    }

    /// Call the underlying function
    #[inline]
    pub fn call(&self, arg: A) -> R {
        (self.func)(arg)
    }

    /// True if both handlers share the same callable, or wrap the same `fn`
    #[inline]
    pub fn same_as(&self, other: &Handler<A, R>) -> bool {
        match (self.fn_addr, other.fn_addr) {
            (Some(a), Some(b)) => a == b,
            _ => Arc::ptr_eq(&self.func, &other.func),
        }
    }
}

impl<R> Handler<(), R> {
    /// Wrap a zero-argument closure
    pub fn nullary<F>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
    {
        Handler::new(move |()| f())
    }
}

impl<A, R> Clone for Handler<A, R> {
    fn clone(&self) -> Self {
        Handler {
            func: Arc::clone(&self.func),
            fn_addr: self.fn_addr,
        }
    }
}

impl<A, R> PartialEq for Handler<A, R> {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

impl<A, R> Eq for Handler<A, R> {}

impl<A, R> fmt::Debug for Handler<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler")
            .field(&Arc::as_ptr(&self.func).cast::<()>())
            .finish()
    }
}
