//! Observable value slot with delivery on the UI thread.
//!
//! `MutableLiveValue` is held by the producer, `LiveValue` is the read-only
//! view handed to consumers. Values posted from any thread are handed to the
//! UI thread through a [`MainHandle`] before observers see them, so observer
//! callbacks only ever run where the UI loop drains its queue.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::dispatcher::{MainHandle, MainTask};

type Callback<T> = Box<dyn FnMut(&T) + Send + 'static>;

struct ObserverSlot<T> {
    active: AtomicBool,
    inner: Mutex<ObserverInner<T>>,
}

struct ObserverInner<T> {
    /// `None` while the callback is running further up the stack.
    callback: Option<Callback<T>>,
    last_version: u64,
    /// Latest value set from inside the running callback.
    redeliver: Option<T>,
}

impl<T: Clone> ObserverSlot<T> {
    fn lock(&self) -> MutexGuard<'_, ObserverInner<T>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Hands `value` to the callback unless this observer was detached or
    /// has already seen `version`.
    ///
    /// The callback runs without the slot lock held, so it may set the value
    /// it observes. Such nested values are delivered once the running call
    /// returns, latest only.
    fn deliver(&self, version: u64, value: &T) {
        if !self.active.load(Ordering::Acquire) {
            return;
        }
        let mut callback = {
            let mut inner = self.lock();
            if inner.last_version >= version {
                return;
            }
            inner.last_version = version;
            match inner.callback.take() {
                Some(callback) => callback,
                None => {
                    inner.redeliver = Some(value.clone());
                    return;
                }
            }
        };

        callback(value);
        loop {
            let mut inner = self.lock();
            let next = inner
                .redeliver
                .take()
                .filter(|_| self.active.load(Ordering::Acquire));
            match next {
                Some(next) => {
                    drop(inner);
                    callback(&next);
                }
                None => {
                    inner.callback = Some(callback);
                    return;
                }
            }
        }
    }
}

struct State<T> {
    value: Option<T>,
    version: u64,
    pending: Option<T>,
    observers: HashMap<u64, Arc<ObserverSlot<T>>>,
    next_id: u64,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    main: MainHandle,
}

impl<T: Clone + Send + 'static> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_value(&self, value: T) {
        let (version, observers) = {
            let mut state = self.lock();
            state.version += 1;
            state.value = Some(value.clone());
            let observers: Vec<_> = state.observers.values().cloned().collect();
            (state.version, observers)
        };
        // The state lock is released here so callbacks may subscribe or detach.
        for observer in observers {
            observer.deliver(version, &value);
        }
    }

    fn apply_pending(&self) {
        let pending = self.lock().pending.take();
        if let Some(value) = pending {
            self.set_value(value);
        }
    }

    fn remove(&self, id: u64) {
        let removed = self.lock().observers.remove(&id);
        if let Some(slot) = removed {
            slot.active.store(false, Ordering::Release);
        }
    }
}

/// Producer side of an observable value.
pub struct MutableLiveValue<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + 'static> MutableLiveValue<T> {
    /// Creates an empty slot. Observers receive nothing until the first value
    /// is set or posted.
    pub fn new(main: MainHandle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    value: None,
                    version: 0,
                    pending: None,
                    observers: HashMap::new(),
                    next_id: 0,
                }),
                main,
            }),
        }
    }

    /// Stores `value` and notifies observers synchronously. Call this on the
    /// UI thread; use [`post_value`](Self::post_value) from anywhere else.
    pub fn set_value(&self, value: T) {
        self.shared.set_value(value);
    }

    /// Schedules `value` to be set on the UI thread.
    ///
    /// While a previous post is still waiting to be applied the new value
    /// replaces it and no second task is queued, so observers only ever see
    /// the latest posted value.
    pub fn post_value(&self, value: T) {
        let needs_dispatch = {
            let mut state = self.shared.lock();
            let idle = state.pending.is_none();
            state.pending = Some(value);
            idle
        };
        if !needs_dispatch {
            return;
        }

        let shared = self.shared.clone();
        if !self
            .shared
            .main
            .post(MainTask::new(move || shared.apply_pending()))
        {
            self.shared.lock().pending = None;
        }
    }

    pub fn reader(&self) -> LiveValue<T> {
        LiveValue {
            shared: self.shared.clone(),
        }
    }

    pub fn value(&self) -> Option<T> {
        self.shared.lock().value.clone()
    }
}

impl<T> Clone for MutableLiveValue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for MutableLiveValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableLiveValue").finish_non_exhaustive()
    }
}

/// Read-only view of an observable value.
pub struct LiveValue<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for LiveValue<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> fmt::Debug for LiveValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveValue").finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> LiveValue<T> {
    pub fn value(&self) -> Option<T> {
        self.shared.lock().value.clone()
    }

    /// Registers `callback` and returns the guard that keeps it registered.
    ///
    /// If the slot already holds a value the callback receives it before this
    /// returns. Call on the UI thread.
    pub fn observe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&T) + Send + 'static,
    {
        let slot = Arc::new(ObserverSlot {
            active: AtomicBool::new(true),
            inner: Mutex::new(ObserverInner {
                callback: Some(Box::new(callback)),
                last_version: 0,
                redeliver: None,
            }),
        });

        let (id, current) = {
            let mut state = self.shared.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.observers.insert(id, slot.clone());
            let current = state.value.clone().map(|v| (state.version, v));
            (id, current)
        };

        if let Some((version, value)) = current {
            slot.deliver(version, &value);
        }

        let shared: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.remove(id);
            } else {
                slot.active.store(false, Ordering::Release);
            }
        })
    }

    pub fn observer_count(&self) -> usize {
        self.shared.lock().observers.len()
    }

    pub fn has_observers(&self) -> bool {
        self.observer_count() > 0
    }
}

/// Keeps an observer registered. Dropping it detaches the observer; any
/// delivery already queued for the UI thread is skipped.
#[must_use = "dropping a Subscription detaches the observer immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    fn new<F: FnOnce() + Send + 'static>(release: F) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn detach(mut self) {
        self.release_now();
    }

    fn release_now(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.release.is_some())
            .finish()
    }
}
