//! Deferred destructors for owning handles.
//!
//! An owning [`Handle`](crate::Handle) registers a finalizer when it is created. The
//! finalizer captures the native pointer value and the type's destructor, never the
//! handle itself, so it can outlive the handle that registered it. The registration
//! is identified by a [`Token`] that the handle keeps:
//!
//! * `destroy` and `give_reference` cancel the token before touching the pointer,
//!   so a cancelled finalizer can never run.
//! * Dropping a handle that still owns its pointer releases the token. The finalizer
//!   then runs immediately or waits for [`collect`], depending on [`Reclaim`].

use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use once_cell::sync::Lazy;

use crate::{handle::Resource, Reclaim};

/// A live finalizer registration. Consumed by exactly one of cancel or release.
#[derive(Debug, PartialEq, Eq)]
pub struct Token(u64);

struct Finalizer {
    name: &'static str,
    addr: usize,
    run: unsafe fn(usize),
}

impl Finalizer {
    fn run(self) {
        log::debug!("finalizing {} handle {:#x}", self.name, self.addr);
        unsafe { (self.run)(self.addr) }
    }
}

#[derive(Default)]
struct Registry {
    next: u64,
    armed: HashMap<u64, Finalizer>,
    unreachable: Vec<Finalizer>,
}

static REGISTRY: Lazy<Mutex<Registry>> = Lazy::new(|| Mutex::new(Registry::default()));
static DEFERRED: AtomicBool = AtomicBool::new(false);

fn registry() -> MutexGuard<'static, Registry> {
    // Finalizers run outside the lock, so a poisoned registry is still consistent.
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

unsafe fn destroy_addr<T: Resource>(addr: usize) {
    let mut ptr = addr as *mut T;
    T::destroy(&mut ptr);
}

pub(crate) fn register<T: Resource>(ptr: NonNull<T>) -> Token {
    let finalizer = Finalizer {
        name: T::NAME,
        addr: ptr.as_ptr() as usize,
        run: destroy_addr::<T>,
    };

    let mut registry = registry();
    debug_assert!(
        !registry.armed.values().any(|armed| armed.addr == finalizer.addr),
        "{} handle {:p} already has an owner",
        T::NAME,
        ptr
    );
    let id = registry.next;
    registry.next += 1;
    log::trace!("armed finalizer {} for {} handle {:p}", id, T::NAME, ptr);
    registry.armed.insert(id, finalizer);
    Token(id)
}

/// Disarms a registration. Returns false if it was no longer armed.
pub(crate) fn cancel(token: Token) -> bool {
    let cancelled = registry().armed.remove(&token.0).is_some();
    log::trace!("cancelled finalizer {}", token.0);
    cancelled
}

/// Hands a registration over for finalization because its handle went away.
pub(crate) fn release(token: Token) {
    let finalizer = {
        let mut registry = registry();
        let finalizer = match registry.armed.remove(&token.0) {
            Some(finalizer) => finalizer,
            None => return,
        };
        if DEFERRED.load(Ordering::Acquire) {
            log::trace!("queued finalizer {} for the next collect", token.0);
            registry.unreachable.push(finalizer);
            return;
        }
        finalizer
    };
    finalizer.run();
}

/// Runs every finalizer released since the last pass and returns how many ran.
///
/// Only [`Reclaim::Deferred`] queues finalizers. Installing a
/// [`Reclaim::Immediate`] config runs this pass itself.
pub fn collect() -> usize {
    let unreachable = std::mem::take(&mut registry().unreachable);
    let count = unreachable.len();
    if count > 0 {
        log::debug!("collect: running {} finalizers", count);
    }
    for finalizer in unreachable {
        finalizer.run();
    }
    count
}

/// Number of finalizers waiting for [`collect`].
pub fn pending() -> usize {
    registry().unreachable.len()
}

/// Number of registrations still held by live handles.
pub fn armed() -> usize {
    registry().armed.len()
}

pub fn reclaim() -> Reclaim {
    if DEFERRED.load(Ordering::Acquire) {
        Reclaim::Deferred
    } else {
        Reclaim::Immediate
    }
}

pub(crate) fn set_reclaim(reclaim: Reclaim) {
    DEFERRED.store(reclaim == Reclaim::Deferred, Ordering::Release);
}

// GRCOV_EXCL_START
#[cfg(test)]
pub(crate) mod testmod {
    use super::*;

    /// Switches to deferred reclaim for the lifetime of the guard. Anything still
    /// queued when the guard drops is discarded without running.
    pub struct DeferredGuard(());

    impl DeferredGuard {
        pub fn enter() -> DeferredGuard {
            set_reclaim(Reclaim::Deferred);
            DeferredGuard(())
        }
    }

    impl Drop for DeferredGuard {
        fn drop(&mut self) {
            set_reclaim(Reclaim::Immediate);
            registry().unreachable.clear();
        }
    }
}
// GRCOV_EXCL_STOP
