//! Multicast Delegate
//!
//! An ordered list of same-signature handlers invoked as a unit. Duplicates
//! are allowed and invocation order is insertion order.
//!
//! Locking:
//! - Every mutation acquires the delegate's own [`PolicyLock`] for the whole
//!   read-modify-store of the list.
//! - Invocation and cloning read a lock-free snapshot and never take the lock,
//!   so they are not serialized against mutation. An invocation already in
//!   flight keeps running the list it started with.

use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::sync::Arc;
use std::{fmt, ptr};

use arc_swap::ArcSwap;
use tracing::trace;

use super::error::{DelegateError, Result};
use super::handler::Handler;
use super::lock::{LockPolicy, PolicyLock};

/// Ordered multicast container of [`Handler`]s under a pluggable lock policy
pub struct MulticastDelegate<A, R> {
    /// Current handler list, replaced wholesale on every mutation
    handlers: ArcSwap<Vec<Handler<A, R>>>,
    /// Exclusively owned, never shared with clones
    lock: PolicyLock,
}

/// Delegate whose handlers take one argument
pub type Delegate<A, R> = MulticastDelegate<A, R>;

/// Delegate whose handlers take no argument
pub type Delegate0<R> = MulticastDelegate<(), R>;

impl<A, R> MulticastDelegate<A, R> {
    /// Create an empty delegate with a fresh lock of the given policy
    pub fn new(policy: LockPolicy) -> Self {
        MulticastDelegate {
            handlers: ArcSwap::from_pointee(Vec::new()),
            lock: PolicyLock::new(policy),
        }
    }

    /// Create a delegate seeded with one handler
    pub fn with_handler(handler: Handler<A, R>, policy: LockPolicy) -> Self {
        MulticastDelegate {
            handlers: ArcSwap::from_pointee(vec![handler]),
            lock: PolicyLock::new(policy),
        }
    }

    /// Lock policy chosen at construction
    pub fn policy(&self) -> LockPolicy {
        self.lock.policy()
    }

    pub fn len(&self) -> usize {
        self.handlers.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.load().is_empty()
    }

    /// Snapshot of the current handler list
    pub fn handlers(&self) -> Arc<Vec<Handler<A, R>>> {
        self.handlers.load_full()
    }

    pub fn contains(&self, handler: &Handler<A, R>) -> bool {
        self.handlers.load().iter().any(|h| h == handler)
    }

    /// Handler at `index`
    ///
    /// # Errors
    ///
    /// [`DelegateError::OutOfRange`] when `index >= len()`.
    pub fn at(&self, index: usize) -> Result<Handler<A, R>> {
        let handlers = self.handlers.load();
        handlers.get(index).cloned().ok_or(DelegateError::OutOfRange {
            index,
            len: handlers.len(),
        })
    }

    /// Apply `f` to a private copy of the list under the lock, then publish it
    fn update<F>(&self, op: &'static str, f: F)
    where
        F: FnOnce(&mut Vec<Handler<A, R>>),
    {
        let _guard = self.lock.acquire();
        let mut list = Vec::clone(&self.handlers.load_full());
        f(&mut list);
        trace!(op, len = list.len(), policy = ?self.lock.policy(), "delegate updated");
        self.handlers.store(Arc::new(list));
    }

    /// Replace the handler list with a copy of `other`'s. The lock and policy
    /// of `self` are kept. Assigning a delegate to itself does nothing.
    pub fn assign(&self, other: &MulticastDelegate<A, R>) -> &Self {
        if ptr::eq(self, other) {
            return self;
        }
        let theirs = other.handlers.load_full();
        let _guard = self.lock.acquire();
        trace!(op = "assign", len = theirs.len(), "delegate updated");
        self.handlers.store(theirs);
        self
    }

    /// Replace the whole list with a single handler
    pub fn assign_handler(&self, handler: Handler<A, R>) -> &Self {
        self.update("assign_handler", |list| {
            list.clear();
            list.push(handler);
        });
        self
    }

    /// Append a handler at the end
    pub fn append(&self, handler: Handler<A, R>) -> &Self {
        self.update("append", |list| list.push(handler));
        self
    }

    /// Append every handler of `other`, in its order
    pub fn append_delegate(&self, other: &MulticastDelegate<A, R>) -> &Self {
        // Snapshot first so that appending a delegate to itself doubles it
        let theirs = other.handlers.load_full();
        self.update("append_delegate", |list| list.extend(theirs.iter().cloned()));
        self
    }

    /// Remove every occurrence of `handler`, keeping survivors in order
    pub fn remove(&self, handler: &Handler<A, R>) -> &Self {
        self.update("remove", |list| list.retain(|h| h != handler));
        self
    }

    /// Remove every occurrence of every handler present in `other`
    pub fn remove_delegate(&self, other: &MulticastDelegate<A, R>) -> &Self {
        let theirs = other.handlers.load_full();
        self.update("remove_delegate", |list| list.retain(|h| !theirs.contains(h)));
        self
    }

    /// Remove all handlers
    pub fn clear(&self) -> &Self {
        self.update("clear", Vec::clear);
        self
    }

    /// Copy of `self` with `handler` appended
    pub fn with_appended(&self, handler: Handler<A, R>) -> Self {
        let ret = self.clone();
        ret.append(handler);
        ret
    }

    /// Copy of `self` with `other`'s handlers appended
    pub fn with_appended_delegate(&self, other: &MulticastDelegate<A, R>) -> Self {
        let ret = self.clone();
        ret.append_delegate(other);
        ret
    }

    /// Copy of `self` without any occurrence of `handler`
    pub fn without(&self, handler: &Handler<A, R>) -> Self {
        let ret = self.clone();
        ret.remove(handler);
        ret
    }

    /// Copy of `self` without any handler present in `other`
    pub fn without_delegate(&self, other: &MulticastDelegate<A, R>) -> Self {
        let ret = self.clone();
        ret.remove_delegate(other);
        ret
    }

    /// Call every handler in order and return the last handler's result.
    ///
    /// Earlier handlers receive a clone of `arg` and their results are
    /// discarded. The list is snapshotted up front without taking the lock,
    /// so handlers may mutate this delegate; the changes apply to the next
    /// invocation.
    ///
    /// # Errors
    ///
    /// [`DelegateError::EmptyInvocation`] when there are no handlers.
    pub fn invoke(&self, arg: A) -> Result<R>
    where
        A: Clone,
    {
        let handlers = self.handlers.load_full();
        let (last, rest) = handlers
            .split_last()
            .ok_or(DelegateError::EmptyInvocation)?;
        for handler in rest {
            handler.call(arg.clone());
        }
        Ok(last.call(arg))
    }
}

impl<R> MulticastDelegate<(), R> {
    /// Invoke a zero-argument delegate
    ///
    /// # Errors
    ///
    /// [`DelegateError::EmptyInvocation`] when there are no handlers.
    pub fn call(&self) -> Result<R> {
        self.invoke(())
    }
}

impl<A, R> Default for MulticastDelegate<A, R> {
    fn default() -> Self {
        MulticastDelegate::new(LockPolicy::default())
    }
}

/// Copies the list as currently published, without taking `self`'s lock, and
/// allocates a new lock of the same policy.
impl<A, R> Clone for MulticastDelegate<A, R> {
    fn clone(&self) -> Self {
        MulticastDelegate {
            handlers: ArcSwap::new(self.handlers.load_full()),
            lock: PolicyLock::new(self.lock.policy()),
        }
    }
}

impl<A, R> From<Handler<A, R>> for MulticastDelegate<A, R> {
    fn from(handler: Handler<A, R>) -> Self {
        MulticastDelegate::with_handler(handler, LockPolicy::default())
    }
}

impl<A, R> fmt::Debug for MulticastDelegate<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MulticastDelegate")
            .field("policy", &self.policy())
            .field("handlers", &self.handlers.load_full())
            .finish()
    }
}

// ============================================================================
// Operator sugar
// ============================================================================

impl<A, R> AddAssign<Handler<A, R>> for MulticastDelegate<A, R> {
    fn add_assign(&mut self, handler: Handler<A, R>) {
        self.append(handler);
    }
}

impl<A, R> AddAssign<&MulticastDelegate<A, R>> for MulticastDelegate<A, R> {
    fn add_assign(&mut self, other: &MulticastDelegate<A, R>) {
        self.append_delegate(other);
    }
}

impl<A, R> SubAssign<&Handler<A, R>> for MulticastDelegate<A, R> {
    fn sub_assign(&mut self, handler: &Handler<A, R>) {
        self.remove(handler);
    }
}

impl<A, R> SubAssign<&MulticastDelegate<A, R>> for MulticastDelegate<A, R> {
    fn sub_assign(&mut self, other: &MulticastDelegate<A, R>) {
        self.remove_delegate(other);
    }
}

impl<A, R> Add<Handler<A, R>> for &MulticastDelegate<A, R> {
    type Output = MulticastDelegate<A, R>;

    fn add(self, handler: Handler<A, R>) -> Self::Output {
        self.with_appended(handler)
    }
}

impl<A, R> Add<Handler<A, R>> for MulticastDelegate<A, R> {
    type Output = MulticastDelegate<A, R>;

    fn add(self, handler: Handler<A, R>) -> Self::Output {
        self.append(handler);
        self
    }
}

impl<A, R> Add<&MulticastDelegate<A, R>> for &MulticastDelegate<A, R> {
    type Output = MulticastDelegate<A, R>;

    fn add(self, other: &MulticastDelegate<A, R>) -> Self::Output {
        self.with_appended_delegate(other)
    }
}

impl<A, R> Sub<&Handler<A, R>> for &MulticastDelegate<A, R> {
    type Output = MulticastDelegate<A, R>;

    fn sub(self, handler: &Handler<A, R>) -> Self::Output {
        self.without(handler)
    }
}

impl<A, R> Sub<&MulticastDelegate<A, R>> for &MulticastDelegate<A, R> {
    type Output = MulticastDelegate<A, R>;

    fn sub(self, other: &MulticastDelegate<A, R>) -> Self::Output {
        self.without_delegate(other)
    }
}

/// `handler + &delegate`: the handler comes first, default policy
impl<A, R> Add<&MulticastDelegate<A, R>> for Handler<A, R> {
    type Output = MulticastDelegate<A, R>;

    fn add(self, delegate: &MulticastDelegate<A, R>) -> Self::Output {
        let ret = MulticastDelegate::from(self);
        ret.append_delegate(delegate);
        ret
    }
}

/// `handler + handler`: a two-entry delegate, default policy
impl<A, R> Add<Handler<A, R>> for Handler<A, R> {
    type Output = MulticastDelegate<A, R>;

    fn add(self, other: Handler<A, R>) -> Self::Output {
        let ret = MulticastDelegate::from(self);
        ret.append(other);
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn constant(v: i32) -> Handler<i32, i32> {
        Handler::new(move |_| v)
    }

    fn ids(d: &MulticastDelegate<i32, i32>) -> Vec<i32> {
        d.handlers().iter().map(|h| h.call(0)).collect()
    }

    #[test]
    fn test_empty_invocation_fails() {
        let d: MulticastDelegate<i32, i32> = MulticastDelegate::new(LockPolicy::Mutex);
        assert_eq!(d.invoke(1), Err(DelegateError::EmptyInvocation));

        let d0: Delegate0<()> = Delegate0::default();
        assert_eq!(d0.call(), Err(DelegateError::EmptyInvocation));
    }

    #[test]
    fn test_invoke_runs_all_and_returns_last() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let make = |tag: &'static str, ret: i32| {
            let log = Arc::clone(&log);
            Handler::new(move |arg: i32| {
                log.lock().unwrap().push((tag, arg));
                ret
            })
        };
        let d = MulticastDelegate::new(LockPolicy::CriticalSection);
        d.append(make("f1", 1)).append(make("f2", 2)).append(make("f3", 3));

        assert_eq!(d.invoke(7), Ok(3));
        assert_eq!(*log.lock().unwrap(), vec![("f1", 7), ("f2", 7), ("f3", 7)]);
    }

    #[test]
    fn test_nullary_call() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = {
            let hits = Arc::clone(&hits);
            Handler::nullary(move || hits.fetch_add(1, Ordering::SeqCst) + 1)
        };
        let d: Delegate0<usize> = MulticastDelegate::with_handler(counter.clone(), LockPolicy::NoLock);
        d.append(counter);
        assert_eq!(d.call(), Ok(2));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_at_bounds() {
        let d = MulticastDelegate::with_handler(constant(10), LockPolicy::Mutex);
        d.append(constant(20));
        assert_eq!(d.at(1).map(|h| h.call(0)), Ok(20));
        assert_eq!(
            d.at(2).map(|h| h.call(0)),
            Err(DelegateError::OutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_assign_handler_replaces_list() {
        let d: MulticastDelegate<i32, i32> = MulticastDelegate::default();
        d.append(constant(1)).append(constant(2));
        d.assign_handler(constant(9));
        assert_eq!(ids(&d), vec![9]);
    }

    #[test]
    fn test_assign_copies_list_not_lock() {
        let src = MulticastDelegate::new(LockPolicy::NoLock);
        src.append(constant(1)).append(constant(2));
        let dst = MulticastDelegate::new(LockPolicy::Mutex);
        dst.append(constant(5));

        dst.assign(&src);
        assert_eq!(ids(&dst), vec![1, 2]);
        assert_eq!(dst.policy(), LockPolicy::Mutex);

        dst.append(constant(3));
        assert_eq!(ids(&src), vec![1, 2]);
    }

    #[test]
    fn test_self_assign_is_noop() {
        let d: MulticastDelegate<i32, i32> = MulticastDelegate::default();
        d.append(constant(1));
        d.assign(&d);
        assert_eq!(ids(&d), vec![1]);
    }

    #[test]
    fn test_clone_is_independent() {
        let a = MulticastDelegate::new(LockPolicy::Mutex);
        a.append(constant(1));
        let b = a.clone();
        assert_eq!(b.policy(), LockPolicy::Mutex);

        b.append(constant(2));
        a.append(constant(3));
        assert_eq!(ids(&a), vec![1, 3]);
        assert_eq!(ids(&b), vec![1, 2]);
    }

    #[test]
    fn test_combine_leaves_operands_untouched() {
        let f = constant(1);
        let g = constant(2);
        let d = MulticastDelegate::with_handler(f.clone(), LockPolicy::default());

        let sum = &d + g.clone();
        assert_eq!(ids(&sum), vec![1, 2]);
        assert_eq!(ids(&d), vec![1]);

        let both = &d + &sum;
        assert_eq!(ids(&both), vec![1, 1, 2]);

        let diff = &both - &f;
        assert_eq!(ids(&diff), vec![2]);
        assert_eq!(both.len(), 3);
    }

    #[test]
    fn test_append_equivalent_to_combine() {
        let d = MulticastDelegate::with_handler(constant(1), LockPolicy::default());
        let combined = &d + constant(5);
        d.append(constant(5));
        assert_eq!(combined.invoke(0), d.invoke(0));
        assert_eq!(d.invoke(0), Ok(5));
    }

    #[test]
    fn test_remove_all_occurrences() {
        let a = constant(1);
        let b = constant(2);
        let c = constant(3);
        let mut d: MulticastDelegate<i32, i32> = MulticastDelegate::default();
        d += b.clone();
        d += a.clone();
        d += b.clone();
        d += c.clone();
        d += b.clone();

        d -= &b;
        assert_eq!(ids(&d), vec![1, 3]);
        assert!(!d.contains(&b));
    }

    fn plus_one(x: i32) -> i32 {
        x + 1
    }

    fn twice(x: i32) -> i32 {
        x * 2
    }

    #[test]
    fn test_remove_fn_handler_by_fresh_wrapper() {
        let d: MulticastDelegate<i32, i32> = MulticastDelegate::default();
        d.append(Handler::from_fn(plus_one))
            .append(Handler::from_fn(twice))
            .append(Handler::from_fn(twice));

        d.remove(&Handler::from_fn(twice));
        assert_eq!(d.len(), 1);
        assert_eq!(d.invoke(5), Ok(6));

        let mut d = &d + Handler::from_fn(twice);
        d -= &Handler::from_fn(plus_one);
        assert_eq!(d.invoke(5), Ok(10));
        assert_eq!(d.len(), 1);
    }

    #[test]
    fn test_remove_delegate_is_set_difference() {
        let (a, b, c) = (constant(1), constant(2), constant(3));
        let d: MulticastDelegate<i32, i32> = MulticastDelegate::default();
        d.append(a.clone()).append(b.clone()).append(c.clone()).append(a.clone());

        let other: MulticastDelegate<i32, i32> = MulticastDelegate::default();
        other.append(c.clone()).append(a.clone()).append(c.clone());

        assert_eq!(ids(&(&d - &other)), vec![2]);
    }

    #[test]
    fn test_self_combination() {
        let d: MulticastDelegate<i32, i32> = MulticastDelegate::default();
        d.append(constant(1)).append(constant(2));
        d.append_delegate(&d);
        assert_eq!(ids(&d), vec![1, 2, 1, 2]);
        d.remove_delegate(&d);
        assert!(d.is_empty());
    }

    #[test]
    fn test_handler_on_the_left() {
        let d = MulticastDelegate::with_handler(constant(2), LockPolicy::NoLock);
        let sum = constant(1) + &d;
        assert_eq!(ids(&sum), vec![1, 2]);
        assert_eq!(sum.policy(), LockPolicy::default());

        let pair = constant(3) + constant(4);
        assert_eq!(ids(&pair), vec![3, 4]);
    }

    #[test]
    fn test_handler_may_mutate_delegate_during_invoke() {
        let d: Arc<MulticastDelegate<i32, i32>> = Arc::new(MulticastDelegate::default());
        let weak = Arc::downgrade(&d);
        d.append(Handler::new(move |x| {
            if let Some(d) = weak.upgrade() {
                d.append(Handler::new(|x| x * 10));
            }
            x
        }));
        // The in-flight call sees the list it started with
        assert_eq!(d.invoke(2), Ok(2));
        assert_eq!(d.len(), 2);
        assert_eq!(d.invoke(2), Ok(20));
    }

    #[test]
    fn test_concurrent_appends_are_serialized() {
        for policy in [LockPolicy::CriticalSection, LockPolicy::Mutex] {
            let d: Arc<MulticastDelegate<i32, i32>> = Arc::new(MulticastDelegate::new(policy));
            let threads: Vec<_> = (0..8)
                .map(|t| {
                    let d = Arc::clone(&d);
                    std::thread::spawn(move || {
                        for _ in 0..100 {
                            d.append(constant(t));
                        }
                    })
                })
                .collect();
            for t in threads {
                t.join().unwrap();
            }
            assert_eq!(d.len(), 800);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Pool of distinct handlers; indices into it stand for identities
        fn pool() -> Vec<Handler<i32, i32>> {
            (0..6).map(constant).collect()
        }

        fn build(pool: &[Handler<i32, i32>], picks: &[usize]) -> MulticastDelegate<i32, i32> {
            let d = MulticastDelegate::new(LockPolicy::NoLock);
            for &i in picks {
                d.append(pool[i].clone());
            }
            d
        }

        proptest! {
            #[test]
            fn at_returns_insertion_order(picks in prop::collection::vec(0usize..6, 0..24)) {
                let pool = pool();
                let d = build(&pool, &picks);
                for (i, &p) in picks.iter().enumerate() {
                    prop_assert_eq!(d.at(i), Ok(pool[p].clone()));
                }
                prop_assert_eq!(
                    d.at(picks.len()),
                    Err(DelegateError::OutOfRange { index: picks.len(), len: picks.len() })
                );
            }

            #[test]
            fn subtracting_handler_removes_every_occurrence(
                picks in prop::collection::vec(0usize..6, 0..24),
                victim in 0usize..6,
            ) {
                let pool = pool();
                let d = build(&pool, &picks);
                let removed = &(&d + pool[victim].clone()) - &pool[victim];
                let expected: Vec<i32> = picks
                    .iter()
                    .filter(|&&p| p != victim)
                    .map(|&p| p as i32)
                    .collect();
                prop_assert!(!removed.contains(&pool[victim]));
                prop_assert_eq!(ids(&removed), expected);
            }

            #[test]
            fn delegate_difference_ignores_order(
                left in prop::collection::vec(0usize..6, 0..24),
                right in prop::collection::vec(0usize..6, 0..8),
            ) {
                let pool = pool();
                let d1 = build(&pool, &left);
                let d2 = build(&pool, &right);
                let mut reversed = right.clone();
                reversed.reverse();
                let d2_rev = build(&pool, &reversed);

                let expected: Vec<i32> = left
                    .iter()
                    .filter(|p| !right.contains(*p))
                    .map(|&p| p as i32)
                    .collect();
                prop_assert_eq!(ids(&(&d1 - &d2)), expected.clone());
                prop_assert_eq!(ids(&(&d1 - &d2_rev)), expected);
            }
        }
    }
}
