// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Fan-in of several streams into one, in production order.
//!
//! Every value of every source is forwarded as it arrives on the merge's dispatcher; the
//! relative order of values from one source is preserved, nothing else is reordered. The
//! output completes once every known source has completed, and fails as soon as any source
//! fails, cancelling the others.
//!
//! Each source is granted a prefetch equal to its declared capacity once the downstream
//! subscriber first requests, and one more unit each time one of its values is delivered
//! downstream. On a bounded dispatcher the grants are cut down so that the values asked
//! for by all live sources fit in its backlog. A dynamic merge takes its sources one at a
//! time.
//!
//! # Example
//!
//! ```
//! use braid_runtime::SynchronousDispatcher;
//! use braid_stream::merge::merge;
//! use braid_stream::sources::from_values;
//! use braid_core::SharedDispatcher;
//! use std::sync::Arc;
//!
//! let dispatcher: SharedDispatcher = Arc::new(SynchronousDispatcher::new());
//! let merged = merge(
//!     dispatcher.clone(),
//!     vec![
//!         from_values(dispatcher.clone(), vec![1, 2]).unwrap(),
//!         from_values(dispatcher.clone(), vec![10, 20, 30]).unwrap(),
//!     ],
//! )
//! .unwrap();
//! assert_eq!(merged.capacity(), braid_core::Capacity::Bounded(2));
//! ```

use crate::outlet::{Outlet, OutletHook};
use crate::upstream::{PrefetchBudget, SourceSink, SourceSubscriber, Upstream};
use crate::BraidStream;
use braid_core::braid_mutex::Mutex;
use braid_core::dispatcher::{require_ordering, usable_capacity};
use braid_core::{
    BraidError, Capacity, Dispatcher, Publisher, Result, SharedDispatcher, Signal, StreamState,
    Subscriber, Subscription,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Merges a fixed list of streams.
///
/// The output declares the smallest capacity among the sources.
///
/// # Errors
/// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering or
/// if `sources` is empty.
pub fn merge<T>(
    dispatcher: SharedDispatcher,
    sources: Vec<BraidStream<T>>,
) -> Result<BraidStream<T>>
where
    T: Send + 'static,
{
    require_ordering(dispatcher.as_ref(), "merge")?;
    if sources.is_empty() {
        return Err(BraidError::configuration("merge requires at least one source"));
    }

    let declared = Capacity::min_of(sources.iter().map(BraidStream::capacity));
    let budget = PrefetchBudget::new(dispatcher.as_ref(), Some(sources.len()));
    let core = MergeCore::new(Arc::clone(&dispatcher), declared, budget, true);
    for source in sources {
        core.add_source(source);
    }
    Ok(BraidStream::new(core, dispatcher))
}

/// Merges every stream emitted by `sources`, as it arrives.
///
/// The output completes once `sources` has completed and every inner stream received so
/// far has completed. It declares the usable capacity of `dispatcher`.
///
/// # Errors
/// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering.
pub fn merge_dynamic<T>(
    dispatcher: SharedDispatcher,
    sources: BraidStream<BraidStream<T>>,
) -> Result<BraidStream<T>>
where
    T: Send + 'static,
{
    require_ordering(dispatcher.as_ref(), "merge")?;

    let declared = usable_capacity(dispatcher.as_ref());
    let budget = PrefetchBudget::new(dispatcher.as_ref(), None);
    let core = MergeCore::new(Arc::clone(&dispatcher), declared, budget, false);
    let outer = Arc::new(Upstream::new());
    core.state.lock().outer = Some(Arc::clone(&outer));
    sources.subscribe(Arc::new(MergeOuter {
        core: Arc::clone(&core),
        upstream: outer,
    }));
    Ok(BraidStream::new(core, dispatcher))
}

struct MergeEntry {
    upstream: Arc<Upstream>,
    prefetch: u64,
}

struct MergeState {
    registry: BTreeMap<u64, MergeEntry>,
    budget: PrefetchBudget,
    outer: Option<Arc<Upstream>>,
    outer_done: bool,
    started: bool,
    terminated: bool,
}

struct MergeCore<T> {
    me: Weak<Self>,
    dispatcher: SharedDispatcher,
    outlet: Outlet<T>,
    next_id: AtomicU64,
    state: Mutex<MergeState>,
}

impl<T: Send + 'static> MergeCore<T> {
    fn new(
        dispatcher: SharedDispatcher,
        declared: Capacity,
        budget: PrefetchBudget,
        outer_done: bool,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me: &Weak<Self>| {
            let hook: Weak<dyn OutletHook> = me.clone();
            Self {
                me: me.clone(),
                outlet: Outlet::new(
                    Arc::clone(&dispatcher),
                    declared,
                    Capacity::Unbounded,
                    Some(hook),
                ),
                dispatcher,
                next_id: AtomicU64::new(1),
                state: Mutex::new(MergeState {
                    registry: BTreeMap::new(),
                    budget,
                    outer: None,
                    outer_done,
                    started: false,
                    terminated: false,
                }),
            }
        })
    }

    fn add_source(&self, source: BraidStream<T>) {
        let Some(core) = self.me.upgrade() else {
            return;
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let upstream = Arc::new(Upstream::new());

        let (started, prefetch) = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            let prefetch = state.budget.grant(source.capacity());
            state.registry.insert(
                id,
                MergeEntry {
                    upstream: Arc::clone(&upstream),
                    prefetch,
                },
            );
            (state.started, prefetch)
        };

        debug!("merge subscribing to source {} with prefetch {}", id, prefetch);
        source.subscribe(Arc::new(SourceSubscriber::new(
            core,
            id,
            Arc::clone(&upstream),
        )));
        if started {
            upstream.request(prefetch);
        }
    }

    fn source_completed(&self, id: u64) {
        let complete = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            let Some(entry) = state.registry.remove(&id) else {
                return;
            };
            state.budget.release(entry.prefetch);
            let complete = state.registry.is_empty() && state.outer_done;
            state.terminated = complete;
            complete
        };
        if complete {
            debug!("merge completed");
            self.outlet.complete();
        }
    }

    fn outer_completed(&self) {
        let complete = {
            let mut state = self.state.lock();
            if state.terminated {
                return;
            }
            state.outer_done = true;
            state.outer = None;
            state.terminated = state.registry.is_empty();
            state.terminated
        };
        if complete {
            self.outlet.complete();
        }
    }

    fn fail(&self, error: BraidError) {
        let cancelled = self.shutdown();
        warn!(
            "merge failed, cancelling {} remaining source(s): {}",
            cancelled, error
        );
        self.outlet.error(error);
    }

    /// Cancels every open subscription, returns how many sources were still active.
    fn shutdown(&self) -> usize {
        let (entries, outer) = {
            let mut state = self.state.lock();
            state.terminated = true;
            (
                core::mem::take(&mut state.registry),
                state.outer.take(),
            )
        };
        if let Some(outer) = outer {
            outer.cancel();
        }
        for entry in entries.values() {
            entry.upstream.cancel();
        }
        entries.len()
    }
}

impl<T: Send + 'static> SourceSink<T> for MergeCore<T> {
    fn dispatcher(&self) -> &dyn Dispatcher {
        self.dispatcher.as_ref()
    }

    fn on_source_signal(&self, id: u64, signal: Signal<T>) {
        match signal {
            Signal::Next(value) => {
                if self.state.lock().terminated {
                    return;
                }
                if let Err(error) = self.outlet.push(value, id) {
                    self.fail(error);
                }
            }
            Signal::Error(error) => self.fail(error),
            Signal::Complete => self.source_completed(id),
        }
    }

    fn on_dispatch_failure(&self, error: BraidError) {
        self.fail(error);
    }
}

impl<T: Send + 'static> OutletHook for MergeCore<T> {
    fn on_request(&self, _n: u64) {
        let grants: Vec<(Arc<Upstream>, u64)> = {
            let mut state = self.state.lock();
            if state.started || state.terminated {
                return;
            }
            state.started = true;
            state
                .registry
                .values()
                .map(|entry| (Arc::clone(&entry.upstream), entry.prefetch))
                .collect()
        };
        for (upstream, prefetch) in grants {
            upstream.request(prefetch);
        }
    }

    fn on_cancel(&self) {
        self.shutdown();
    }

    fn on_delivered(&self, origin: u64) {
        let upstream = self
            .state
            .lock()
            .registry
            .get(&origin)
            .map(|entry| Arc::clone(&entry.upstream));
        if let Some(upstream) = upstream {
            upstream.request(1);
        }
    }
}

impl<T: Send + 'static> Publisher<T> for MergeCore<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        self.outlet.subscribe(subscriber);
    }

    fn capacity(&self) -> Capacity {
        self.outlet.capacity()
    }

    fn state(&self) -> StreamState {
        self.outlet.state()
    }
}

/// Subscriber to the stream of sources of a dynamic merge.
struct MergeOuter<T> {
    core: Arc<MergeCore<T>>,
    upstream: Arc<Upstream>,
}

impl<T: Send + 'static> MergeOuter<T> {
    fn run(&self, task: impl FnOnce(&MergeCore<T>) + Send + 'static) {
        let core = Arc::clone(&self.core);
        if let Err(error) = self.core.dispatcher.dispatch(Box::new(move || task(&core))) {
            self.core.fail(error);
        }
    }
}

impl<T: Send + 'static> Subscriber<BraidStream<T>> for MergeOuter<T> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.upstream.attach(subscription);
        self.upstream.request(1);
    }

    fn on_next(&self, source: BraidStream<T>) {
        let upstream = Arc::clone(&self.upstream);
        self.run(move |core| {
            core.add_source(source);
            upstream.request(1);
        });
    }

    fn on_error(&self, error: BraidError) {
        self.run(move |core| core.fail(error));
    }

    fn on_complete(&self) {
        self.run(MergeCore::outer_completed);
    }
}
