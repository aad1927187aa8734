// Copyright 2025 Umberto Gotti <umberto.gotti@umbertogotti.dev>
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Lock-step pairing of several streams.
//!
//! The k-th output is the aggregation of the k-th value of every source, regardless of
//! arrival order: a value for a slot that is already filled waits for the next frame. The
//! output completes as soon as a completed source has no value left for the current
//! frame; values already received from the other sources are discarded. Any source error
//! fails the output and cancels the remaining sources.
//!
//! Each source is granted a prefetch equal to its declared capacity once the downstream
//! subscriber first requests, and one more unit each time a frame is delivered. On a
//! bounded dispatcher the grants are cut down so that the values asked for by all sources
//! fit in its backlog. A dynamic zip takes its sources one at a time.
//!
//! Frames are emitted by one caller at a time: a signal arriving while frames are being
//! pushed only queues its value, and the emitting caller picks it up before giving up its
//! turn. Frames therefore reach the output in frame order even when pushing a frame
//! re-enters the zip.

mod tuple;

pub use tuple::ZipSources;

use crate::outlet::{Outlet, OutletHook};
use crate::upstream::{PrefetchBudget, SourceSink, SourceSubscriber, Upstream};
use crate::BraidStream;
use braid_core::braid_mutex::Mutex;
use braid_core::dispatcher::{require_ordering, usable_capacity};
use braid_core::{
    BraidError, Capacity, Dispatcher, Publisher, Result, SharedDispatcher, Signal, StreamState,
    Subscriber, Subscription,
};
use self::tuple::Erased;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Aggregator<T, V> = dyn Fn(Vec<T>) -> Result<V> + Send + Sync;

/// Zips a fixed list of streams of the same type.
///
/// `aggregator` receives one value per source, in source order. The output declares the
/// smallest capacity among the sources.
///
/// # Errors
/// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering or
/// if `sources` is empty.
///
/// # Example
///
/// ```
/// use braid_runtime::SynchronousDispatcher;
/// use braid_stream::sources::from_values;
/// use braid_stream::zip::zip_all;
/// use braid_core::SharedDispatcher;
/// use std::sync::Arc;
///
/// let dispatcher: SharedDispatcher = Arc::new(SynchronousDispatcher::new());
/// let sums = zip_all(
///     dispatcher.clone(),
///     vec![
///         from_values(dispatcher.clone(), vec![1, 2, 3]).unwrap(),
///         from_values(dispatcher.clone(), vec![10, 20]).unwrap(),
///     ],
///     |values| values.iter().sum::<i32>(),
/// )
/// .unwrap();
/// assert_eq!(sums.capacity(), braid_core::Capacity::Bounded(2));
/// ```
pub fn zip_all<T, V, F>(
    dispatcher: SharedDispatcher,
    sources: Vec<BraidStream<T>>,
    aggregator: F,
) -> Result<BraidStream<V>>
where
    T: Send + 'static,
    V: Send + 'static,
    F: Fn(Vec<T>) -> V + Send + Sync + 'static,
{
    zip_erased(
        dispatcher,
        sources,
        Arc::new(move |values: Vec<T>| -> Result<V> { Ok(aggregator(values)) }),
    )
}

/// Zips a tuple of 2 to 8 streams of possibly different types.
///
/// `aggregator` receives a tuple holding one value per source.
///
/// # Errors
/// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering.
///
/// # Example
///
/// ```
/// use braid_runtime::SynchronousDispatcher;
/// use braid_stream::sources::from_values;
/// use braid_stream::zip::zip;
/// use braid_core::SharedDispatcher;
/// use std::sync::Arc;
///
/// let dispatcher: SharedDispatcher = Arc::new(SynchronousDispatcher::new());
/// let labels = zip(
///     dispatcher.clone(),
///     (
///         from_values(dispatcher.clone(), vec![1, 2, 3]).unwrap(),
///         from_values(dispatcher.clone(), vec!["a", "b"]).unwrap(),
///     ),
///     |(n, s)| format!("{s}{n}"),
/// )
/// .unwrap();
/// assert_eq!(labels.capacity(), braid_core::Capacity::Bounded(2));
/// ```
pub fn zip<S, V, F>(
    dispatcher: SharedDispatcher,
    sources: S,
    aggregator: F,
) -> Result<BraidStream<V>>
where
    S: ZipSources,
    V: Send + 'static,
    F: Fn(S::Output) -> V + Send + Sync + 'static,
{
    zip_erased(
        dispatcher,
        sources.into_erased(),
        Arc::new(move |values: Vec<Erased>| -> Result<V> {
            S::assemble(values).map(&aggregator)
        }),
    )
}

/// Zips the streams emitted by `sources`.
///
/// Each arriving stream becomes a new slot. Frames are only formed once the number of
/// slots is settled: when `arity` streams have arrived, or when `sources` completes. A
/// stream arriving after that fails the output with a configuration error. If `sources`
/// completes without emitting anything, so does the output. The output declares the
/// usable capacity of `dispatcher`.
///
/// # Errors
/// Returns [`BraidError::Configuration`] if the dispatcher does not support ordering or
/// if `arity` is `Some(0)`.
pub fn zip_dynamic<T, V, F>(
    dispatcher: SharedDispatcher,
    sources: BraidStream<BraidStream<T>>,
    arity: Option<usize>,
    aggregator: F,
) -> Result<BraidStream<V>>
where
    T: Send + 'static,
    V: Send + 'static,
    F: Fn(Vec<T>) -> V + Send + Sync + 'static,
{
    require_ordering(dispatcher.as_ref(), "zip")?;
    if arity == Some(0) {
        return Err(BraidError::configuration("zip arity must be positive"));
    }

    let declared = usable_capacity(dispatcher.as_ref());
    let budget = PrefetchBudget::new(dispatcher.as_ref(), arity);
    let core = ZipCore::new(
        Arc::clone(&dispatcher),
        declared,
        budget,
        Arc::new(move |values: Vec<T>| -> Result<V> { Ok(aggregator(values)) }),
        arity,
    );
    let outer = Arc::new(Upstream::new());
    core.state.lock().outer = Some(Arc::clone(&outer));
    sources.subscribe(Arc::new(ZipOuter {
        core: Arc::clone(&core),
        upstream: outer,
    }));
    Ok(BraidStream::new(core, dispatcher))
}

fn zip_erased<T, V>(
    dispatcher: SharedDispatcher,
    sources: Vec<BraidStream<T>>,
    aggregator: Arc<Aggregator<T, V>>,
) -> Result<BraidStream<V>>
where
    T: Send + 'static,
    V: Send + 'static,
{
    require_ordering(dispatcher.as_ref(), "zip")?;
    if sources.is_empty() {
        return Err(BraidError::configuration("zip requires at least one source"));
    }

    let declared = Capacity::min_of(sources.iter().map(BraidStream::capacity));
    let budget = PrefetchBudget::new(dispatcher.as_ref(), Some(sources.len()));
    let core = ZipCore::new(
        Arc::clone(&dispatcher),
        declared,
        budget,
        aggregator,
        Some(sources.len()),
    );
    for source in sources {
        core.add_source(source)?;
    }
    Ok(BraidStream::new(core, dispatcher))
}

struct ZipSlot<T> {
    queue: VecDeque<T>,
    done: bool,
    upstream: Arc<Upstream>,
    prefetch: u64,
}

struct ZipState<T> {
    slots: BTreeMap<u64, ZipSlot<T>>,
    budget: PrefetchBudget,
    arity: Option<usize>,
    fixed: bool,
    outer: Option<Arc<Upstream>>,
    started: bool,
    emitting: bool,
    terminated: bool,
}

impl<T> ZipState<T> {
    /// Pops the next frame, if every slot holds a value.
    fn take_frame(&mut self) -> Option<Vec<T>> {
        if !self.fixed
            || self.slots.is_empty()
            || self.slots.values().any(|slot| slot.queue.is_empty())
        {
            return None;
        }
        Some(
            self.slots
                .values_mut()
                .filter_map(|slot| slot.queue.pop_front())
                .collect(),
        )
    }

    /// No further frame can be formed.
    fn exhausted(&self) -> bool {
        self.fixed
            && (self.slots.is_empty()
                || self
                    .slots
                    .values()
                    .any(|slot| slot.done && slot.queue.is_empty()))
    }

    fn upstreams(&self) -> impl Iterator<Item = Arc<Upstream>> + '_ {
        self.slots.values().map(|slot| Arc::clone(&slot.upstream))
    }
}

/// Next step of an emission turn.
enum Emission<T> {
    Frame(Vec<T>),
    /// No further frame can be formed; the upstreams to cancel.
    Finished(Vec<Arc<Upstream>>),
    Idle,
}

struct ZipCore<T, V> {
    me: Weak<Self>,
    dispatcher: SharedDispatcher,
    outlet: Outlet<V>,
    aggregator: Arc<Aggregator<T, V>>,
    next_id: AtomicU64,
    state: Mutex<ZipState<T>>,
}

impl<T: Send + 'static, V: Send + 'static> ZipCore<T, V> {
    fn new(
        dispatcher: SharedDispatcher,
        declared: Capacity,
        budget: PrefetchBudget,
        aggregator: Arc<Aggregator<T, V>>,
        arity: Option<usize>,
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
                aggregator,
                next_id: AtomicU64::new(1),
                state: Mutex::new(ZipState {
                    slots: BTreeMap::new(),
                    budget,
                    arity,
                    fixed: false,
                    outer: None,
                    started: false,
                    emitting: false,
                    terminated: false,
                }),
            }
        })
    }

    /// Registers a new slot and subscribes to its source.
    ///
    /// Fails once the number of slots is settled.
    fn add_source(&self, source: BraidStream<T>) -> Result<()> {
        let Some(core) = self.me.upgrade() else {
            return Ok(());
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let upstream = Arc::new(Upstream::new());

        let (started, prefetch) = {
            let mut state = self.state.lock();
            if state.terminated {
                return Ok(());
            }
            if state.fixed {
                return Err(BraidError::configuration(format!(
                    "zip already started with {} source(s), a late source cannot join",
                    state.slots.len()
                )));
            }
            let prefetch = state.budget.grant(source.capacity());
            state.slots.insert(
                id,
                ZipSlot {
                    queue: VecDeque::new(),
                    done: false,
                    upstream: Arc::clone(&upstream),
                    prefetch,
                },
            );
            if state.arity == Some(state.slots.len()) {
                state.fixed = true;
            }
            (state.started, prefetch)
        };

        source.subscribe(Arc::new(SourceSubscriber::new(
            core,
            id,
            Arc::clone(&upstream),
        )));
        if started {
            upstream.request(prefetch);
        }
        self.evaluate();
        Ok(())
    }

    /// Emits every complete frame, then completes if no further frame can be formed.
    ///
    /// Only one caller emits at a time. A caller finding the turn taken returns at once:
    /// whatever it queued is picked up by the emitting caller.
    fn evaluate(&self) {
        {
            let mut state = self.state.lock();
            if state.emitting || state.terminated {
                return;
            }
            state.emitting = true;
        }

        loop {
            let step = {
                let mut state = self.state.lock();
                if state.terminated {
                    state.emitting = false;
                    return;
                }
                match state.take_frame() {
                    Some(frame) => Emission::Frame(frame),
                    None if state.exhausted() => {
                        state.terminated = true;
                        state.emitting = false;
                        let mut upstreams: Vec<_> = state.upstreams().collect();
                        upstreams.extend(state.outer.take());
                        Emission::Finished(upstreams)
                    }
                    None => {
                        state.emitting = false;
                        Emission::Idle
                    }
                }
            };

            match step {
                Emission::Frame(frame) => {
                    let pushed =
                        (self.aggregator)(frame).and_then(|value| self.outlet.push(value, 0));
                    if let Err(error) = pushed {
                        self.fail(error);
                    }
                }
                Emission::Finished(upstreams) => {
                    debug!("zip completed, cancelling {} source(s)", upstreams.len());
                    for upstream in upstreams {
                        upstream.cancel();
                    }
                    self.outlet.complete();
                    return;
                }
                Emission::Idle => return,
            }
        }
    }

    fn settle(&self) {
        {
            let mut state = self.state.lock();
            state.fixed = true;
            state.outer = None;
        }
        self.evaluate();
    }

    fn fail(&self, error: BraidError) {
        let cancelled = self.shutdown();
        warn!(
            "zip failed, cancelling {} source(s): {}",
            cancelled, error
        );
        self.outlet.error(error);
    }

    fn shutdown(&self) -> usize {
        let (upstreams, outer) = {
            let mut state = self.state.lock();
            state.terminated = true;
            let upstreams: Vec<_> = state.upstreams().collect();
            state.slots.clear();
            (upstreams, state.outer.take())
        };
        if let Some(outer) = outer {
            outer.cancel();
        }
        for upstream in &upstreams {
            upstream.cancel();
        }
        upstreams.len()
    }
}

impl<T: Send + 'static, V: Send + 'static> SourceSink<T> for ZipCore<T, V> {
    fn dispatcher(&self) -> &dyn Dispatcher {
        self.dispatcher.as_ref()
    }

    fn on_source_signal(&self, id: u64, signal: Signal<T>) {
        match signal {
            Signal::Next(value) => {
                {
                    let mut state = self.state.lock();
                    if state.terminated {
                        return;
                    }
                    if let Some(slot) = state.slots.get_mut(&id) {
                        slot.queue.push_back(value);
                    }
                }
                self.evaluate();
            }
            Signal::Complete => {
                {
                    let mut state = self.state.lock();
                    if let Some(slot) = state.slots.get_mut(&id) {
                        slot.done = true;
                    }
                }
                self.evaluate();
            }
            Signal::Error(error) => self.fail(error),
        }
    }

    fn on_dispatch_failure(&self, error: BraidError) {
        self.fail(error);
    }
}

impl<T: Send + 'static, V: Send + 'static> OutletHook for ZipCore<T, V> {
    fn on_request(&self, _n: u64) {
        let grants: Vec<(Arc<Upstream>, u64)> = {
            let mut state = self.state.lock();
            if state.started || state.terminated {
                return;
            }
            state.started = true;
            state
                .slots
                .values()
                .map(|slot| (Arc::clone(&slot.upstream), slot.prefetch))
                .collect()
        };
        for (upstream, prefetch) in grants {
            upstream.request(prefetch);
        }
    }

    fn on_cancel(&self) {
        self.shutdown();
    }

    fn on_delivered(&self, _origin: u64) {
        let upstreams: Vec<_> = {
            let state = self.state.lock();
            state
                .slots
                .values()
                .filter(|slot| !slot.done)
                .map(|slot| Arc::clone(&slot.upstream))
                .collect()
        };
        for upstream in upstreams {
            upstream.request(1);
        }
    }
}

impl<T: Send + 'static, V: Send + 'static> Publisher<V> for ZipCore<T, V> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<V>>) {
        self.outlet.subscribe(subscriber);
    }

    fn capacity(&self) -> Capacity {
        self.outlet.capacity()
    }

    fn state(&self) -> StreamState {
        self.outlet.state()
    }
}

/// Subscriber to the stream of sources of a dynamic zip.
struct ZipOuter<T, V> {
    core: Arc<ZipCore<T, V>>,
    upstream: Arc<Upstream>,
}

impl<T: Send + 'static, V: Send + 'static> ZipOuter<T, V> {
    fn run(&self, task: impl FnOnce(&ZipCore<T, V>) + Send + 'static) {
        let core = Arc::clone(&self.core);
        if let Err(error) = self.core.dispatcher.dispatch(Box::new(move || task(&core))) {
            self.core.fail(error);
        }
    }
}

impl<T: Send + 'static, V: Send + 'static> Subscriber<BraidStream<T>> for ZipOuter<T, V> {
    fn on_subscribe(&self, subscription: Arc<dyn Subscription>) {
        self.upstream.attach(subscription);
        self.upstream.request(1);
    }

    fn on_next(&self, source: BraidStream<T>) {
        let upstream = Arc::clone(&self.upstream);
        self.run(move |core| match core.add_source(source) {
            Ok(()) => upstream.request(1),
            Err(error) => core.fail(error),
        });
    }

    fn on_error(&self, error: BraidError) {
        self.run(move |core| core.fail(error));
    }

    fn on_complete(&self) {
        self.run(ZipCore::settle);
    }
}
