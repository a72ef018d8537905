// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded reuse of decoder handles across page workers.
//
// Handles are created lazily on a pool miss and parked in an idle set of at
// most `capacity` entries when released. A handle released into a full pool
// is closed on the spot, so the number of live handles never exceeds
// `capacity` plus the number currently checked out.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use codescan_core::error::Result;
use tracing::{debug, info};

use crate::engine::DecodeEngine;

type Factory<E> = Box<dyn Fn() -> Result<E> + Send + Sync>;

/// Pool of exclusive-use decoder handles.
pub struct HandlePool<E: DecodeEngine> {
    idle: Mutex<Vec<E>>,
    capacity: usize,
    factory: Factory<E>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

impl<E: DecodeEngine> HandlePool<E> {
    /// Create an empty pool holding at most `capacity` idle handles, built on
    /// demand by `factory`.
    pub fn new(capacity: usize, factory: impl Fn() -> Result<E> + Send + Sync + 'static) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
            factory: Box::new(factory),
            created: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        }
    }

    /// Take an idle handle, or build a new one if none is parked.
    pub fn acquire(&self) -> Result<E> {
        if let Some(handle) = self.lock_idle().pop() {
            return Ok(handle);
        }
        let handle = (self.factory)()?;
        let total = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(created = total, "Decoder handle created");
        Ok(handle)
    }

    /// Return a handle. It is parked if there is room, otherwise closed.
    pub fn release(&self, handle: E) {
        let surplus = {
            let mut idle = self.lock_idle();
            if idle.len() < self.capacity {
                idle.push(handle);
                None
            } else {
                Some(handle)
            }
        };
        if let Some(handle) = surplus {
            self.destroy(handle);
            debug!("Pool full, surplus decoder handle closed");
        }
    }

    /// Check a handle out for the lifetime of the returned guard.
    pub fn lease(&self) -> Result<Lease<'_, E>> {
        Ok(Lease {
            pool: self,
            handle: Some(self.acquire()?),
        })
    }

    /// Close every idle handle and return how many were closed.
    ///
    /// Handles checked out at the time are unaffected and may still be
    /// released afterwards.
    pub fn drain(&self) -> usize {
        let handles: Vec<E> = self.lock_idle().drain(..).collect();
        let count = handles.len();
        for handle in handles {
            self.destroy(handle);
        }
        if count > 0 {
            info!(closed = count, "Decoder pool drained");
        }
        count
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Handles currently parked.
    pub fn idle(&self) -> usize {
        self.lock_idle().len()
    }

    /// Handles built over the pool's lifetime.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Handles closed over the pool's lifetime.
    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn destroy(&self, handle: E) {
        handle.close();
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }

    // The idle set holds plain handles, so a poisoned lock leaves it intact.
    fn lock_idle(&self) -> MutexGuard<'_, Vec<E>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<E: DecodeEngine> Drop for HandlePool<E> {
    fn drop(&mut self) {
        self.drain();
    }
}

impl<E: DecodeEngine> std::fmt::Debug for HandlePool<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlePool")
            .field("capacity", &self.capacity)
            .field("idle", &self.idle())
            .field("created", &self.created())
            .field("destroyed", &self.destroyed())
            .finish()
    }
}

/// A checked-out handle, returned to its pool when dropped.
pub struct Lease<'a, E: DecodeEngine> {
    pool: &'a HandlePool<E>,
    handle: Option<E>,
}

impl<E: DecodeEngine> Deref for Lease<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        // Only `drop` takes the handle out.
        match &self.handle {
            Some(handle) => handle,
            None => unreachable!("lease used after release"),
        }
    }
}

impl<E: DecodeEngine> DerefMut for Lease<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        match &mut self.handle {
            Some(handle) => handle,
            None => unreachable!("lease used after release"),
        }
    }
}

impl<E: DecodeEngine> Drop for Lease<'_, E> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.release(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedEngine;
    use codescan_core::CodescanError;

    fn pool(capacity: usize) -> (HandlePool<ScriptedEngine>, ScriptedEngine) {
        let template = ScriptedEngine::silent();
        let factory = template.clone();
        (HandlePool::new(capacity, move || Ok(factory.clone())), template)
    }

    #[test]
    fn acquire_reuses_idle_handles() {
        let (pool, _) = pool(2);
        let handle = pool.acquire().unwrap();
        pool.release(handle);
        assert_eq!(pool.idle(), 1);
        let _again = pool.acquire().unwrap();
        assert_eq!(pool.created(), 1);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn miss_beyond_capacity_creates_new_handle() {
        let (pool, _) = pool(2);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        let c = pool.acquire().unwrap();
        assert_eq!(pool.created(), 3);

        pool.release(a);
        pool.release(b);
        assert_eq!(pool.idle(), 2);
        assert_eq!(pool.destroyed(), 0);

        pool.release(c);
        assert_eq!(pool.idle(), 2);
        assert_eq!(pool.destroyed(), 1);
    }

    #[test]
    fn live_handles_bounded_by_capacity_plus_borrows() {
        let (pool, _) = pool(3);
        let held: Vec<_> = (0..5).map(|_| pool.acquire().unwrap()).collect();
        let borrowed = held.len();
        for handle in held {
            pool.release(handle);
        }
        let live = pool.created() - pool.destroyed();
        assert!(live <= pool.capacity() + borrowed);
        assert_eq!(live, pool.capacity());
    }

    #[test]
    fn drain_closes_idle_handles() {
        let (pool, family) = pool(4);
        let handles: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        for handle in handles {
            pool.release(handle);
        }
        assert_eq!(pool.drain(), 3);
        assert_eq!(pool.idle(), 0);
        assert_eq!(family.closed(), 3);
        assert_eq!(pool.drain(), 0);
    }

    #[test]
    fn lease_returns_handle_on_drop() {
        let (pool, _) = pool(1);
        {
            let mut lease = pool.lease().unwrap();
            let image = image::GrayImage::new(1, 1);
            lease.decode(&image).unwrap();
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn dropping_pool_closes_parked_handles() {
        let (pool, family) = pool(2);
        let handle = pool.acquire().unwrap();
        pool.release(handle);
        drop(pool);
        assert_eq!(family.closed(), 1);
    }

    #[test]
    fn factory_failure_is_reported() {
        let pool: HandlePool<ScriptedEngine> =
            HandlePool::new(1, || Err(CodescanError::Engine("no license".into())));
        assert!(matches!(pool.acquire(), Err(CodescanError::Engine(_))));
        assert_eq!(pool.created(), 0);
    }
}
