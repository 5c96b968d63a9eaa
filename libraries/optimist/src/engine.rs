//! # SyncEngine
//! One engine is owned by one view. It holds the engagement state of every key the view displays,
//! applies optimistic flips, and reconciles them with the server's answers.
//!
//! Everything runs on one thread: state lives in `RefCell`s and no borrow is held across an `.await`.
//! Requests run as tasks on the [`LocalSpawn`] the engine was built with, so they go out whether or
//! not anyone awaits the [`PendingToggle`].

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    fmt::Debug,
    future::Future,
    hash::Hash,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::{
    FutureExt as _,
    channel::oneshot,
    future::{LocalBoxFuture, Shared as SharedFuture},
    task::{LocalSpawn, LocalSpawnExt as _},
};
use slotmap::{SlotMap, new_key_type};

use crate::{EngagementState, RemoteFailure, SyncMode, ToggleError, ToggleRemote, TokenSource};

new_key_type! {
    pub struct ListenerKey;
}

type Listener<K> = Rc<dyn Fn(&K, EngagementState)>;

// Resolves once a serialized toggle and every toggle queued before it have settled.
type Turn = SharedFuture<LocalBoxFuture<'static, ()>>;

struct Slot {
    confirmed: EngagementState,
    unacknowledged: u32,
    mode: SyncMode,
    tail: Option<Turn>,
}

impl Slot {
    fn new(confirmed: EngagementState, mode: SyncMode) -> Self {
        Self {
            confirmed,
            unacknowledged: 0,
            mode,
            tail: None,
        }
    }

    fn displayed(&self) -> EngagementState {
        (0..self.unacknowledged).fold(self.confirmed, |state, _| state.flipped())
    }
}

struct Shared<K, R> {
    remote: R,
    tokens: Rc<dyn TokenSource>,
    spawner: Rc<dyn LocalSpawn>,
    slots: RefCell<HashMap<K, Slot>>,
    listeners: RefCell<SlotMap<ListenerKey, Listener<K>>>,
    disposed: Cell<bool>,
}

impl<K: Clone + Eq + Hash + Debug, R> Shared<K, R> {
    fn notify(&self, key: &K, state: EngagementState) {
        if self.disposed.get() {
            return;
        }
        // clone the callbacks out so a listener can (un)register listeners without a borrow panic
        let listeners: Vec<Listener<K>> = self.listeners.borrow().values().cloned().collect();
        for listener in listeners {
            listener(key, state);
        }
    }
}

pub struct SyncEngine<K, R> {
    shared: Rc<Shared<K, R>>,
}

impl<K, R> Clone for SyncEngine<K, R> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<K, R> SyncEngine<K, R>
where
    K: Clone + Eq + Hash + Debug + 'static,
    R: ToggleRemote<K> + 'static,
{
    pub fn new(remote: R, tokens: Rc<dyn TokenSource>, spawner: Rc<dyn LocalSpawn>) -> Self {
        Self {
            shared: Rc::new(Shared {
                remote,
                tokens,
                spawner,
                slots: RefCell::new(HashMap::new()),
                listeners: RefCell::new(SlotMap::with_key()),
                disposed: Cell::new(false),
            }),
        }
    }

    /// Seed `key` with the state the server last reported, using the default [`SyncMode`].
    pub fn track(&self, key: K, state: EngagementState) {
        self.track_with_mode(key, state, SyncMode::default());
    }

    /// Seed `key` with the state the server last reported.
    ///
    /// Re-tracking a key replaces its confirmed state and mode; flips that are still
    /// in flight stay pending on top of it.
    pub fn track_with_mode(&self, key: K, state: EngagementState, mode: SyncMode) {
        if self.shared.disposed.get() {
            return;
        }
        let displayed = {
            let mut slots = self.shared.slots.borrow_mut();
            let slot = slots
                .entry(key.clone())
                .or_insert_with(|| Slot::new(state, mode));
            slot.confirmed = state;
            slot.mode = mode;
            slot.displayed()
        };
        self.shared.notify(&key, displayed);
    }

    pub fn set_mode(&self, key: &K, mode: SyncMode) {
        if let Some(slot) = self.shared.slots.borrow_mut().get_mut(key) {
            slot.mode = mode;
        }
    }

    /// The state the view should display for `key`, optimistic flips included.
    pub fn state(&self, key: &K) -> Option<EngagementState> {
        self.shared.slots.borrow().get(key).map(Slot::displayed)
    }

    /// Whether `key` has toggles the server has not answered yet.
    pub fn is_pending(&self, key: &K) -> bool {
        self.shared
            .slots
            .borrow()
            .get(key)
            .is_some_and(|slot| slot.unacknowledged > 0)
    }

    /// Apply an authoritative state obtained outside of a toggle (e.g. a status refresh).
    pub fn reconcile(&self, key: &K, state: EngagementState) {
        if self.shared.disposed.get() {
            return;
        }
        let displayed = {
            let mut slots = self.shared.slots.borrow_mut();
            let Some(slot) = slots.get_mut(key) else {
                log::debug!("Ignoring reconcile for untracked key {key:?}");
                return;
            };
            slot.confirmed = state;
            slot.displayed()
        };
        self.shared.notify(key, displayed);
    }

    /// Flip `key` optimistically and spawn the request that confirms it.
    ///
    /// The optimistic state is visible through [`SyncEngine::state`] as soon as this returns.
    /// The returned [`PendingToggle`] resolves once the server has answered and the key has
    /// been reconciled (or rolled back). It can be dropped; the request still goes out.
    /// If the spawner refuses the request, the flip is rolled back and this fails with
    /// [`ToggleError::Cancelled`].
    pub fn toggle(&self, key: K) -> Result<PendingToggle, ToggleError> {
        let shared = &self.shared;
        if shared.disposed.get() {
            return Err(ToggleError::Disposed);
        }
        let Some(token) = shared.tokens.bearer_token() else {
            return Err(ToggleError::Unauthenticated);
        };

        let (optimistic, wait_for, turn) = {
            let mut slots = shared.slots.borrow_mut();
            let Some(slot) = slots.get_mut(&key) else {
                return Err(ToggleError::TargetMissing);
            };
            slot.unacknowledged += 1;
            let (wait_for, turn) = match slot.mode {
                SyncMode::Serialized => {
                    let (turn, done) = oneshot::channel::<()>();
                    let previous = slot.tail.take();
                    let queued = previous.clone();
                    let tail = async move {
                        if let Some(previous) = queued {
                            previous.await;
                        }
                        // a dropped sender means this toggle settled or its task was dropped; both free the turn
                        let _ = done.await;
                    }
                    .boxed_local()
                    .shared();
                    slot.tail = Some(tail);
                    (previous, Some(turn))
                }
                SyncMode::LastWriteWins => (None, None),
            };
            (slot.displayed(), wait_for, turn)
        };
        shared.notify(&key, optimistic);

        let in_flight = InFlight {
            shared: Rc::clone(shared),
            key,
            turn,
            settled: false,
        };

        let (answer, result) = oneshot::channel();
        let task = async move {
            let mut in_flight = in_flight;
            if let Some(previous) = wait_for {
                previous.await;
            }
            let outcome = in_flight
                .shared
                .remote
                .toggle(&in_flight.key, &token)
                .await;
            // the caller may have stopped listening
            let _ = answer.send(in_flight.settle(outcome));
        };

        // a refused task is dropped right here, and dropping it rolls the flip back
        if let Err(e) = shared.spawner.spawn_local(task) {
            log::error!("Could not start toggle request: {e}");
            return Err(ToggleError::Cancelled);
        }

        Ok(PendingToggle { optimistic, result })
    }

    pub fn register_listener(
        &self,
        listener: impl Fn(&K, EngagementState) + 'static,
    ) -> ListenerKey {
        self.shared.listeners.borrow_mut().insert(Rc::new(listener))
    }

    pub fn unregister_listener(&self, key: ListenerKey) {
        self.shared.listeners.borrow_mut().remove(key);
    }

    /// Stop writing state and calling listeners. Requests already in flight still complete,
    /// but their answers are discarded.
    pub fn dispose(&self) {
        self.shared.disposed.set(true);
        self.shared.listeners.borrow_mut().clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.get()
    }
}

/// A toggle whose optimistic phase already happened. Await it for the server's verdict,
/// or drop it if the displayed state is all you need.
pub struct PendingToggle {
    optimistic: EngagementState,
    result: oneshot::Receiver<Result<EngagementState, ToggleError>>,
}

impl PendingToggle {
    /// The state displayed right after the optimistic flip.
    pub fn optimistic(&self) -> EngagementState {
        self.optimistic
    }
}

impl Future for PendingToggle {
    type Output = Result<EngagementState, ToggleError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // a closed channel means the executor dropped the request before it settled
        self.result
            .poll_unpin(cx)
            .map(|result| result.unwrap_or(Err(ToggleError::Cancelled)))
    }
}

impl Debug for PendingToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingToggle")
            .field("optimistic", &self.optimistic)
            .finish_non_exhaustive()
    }
}

struct InFlight<K: Clone + Eq + Hash + Debug, R> {
    shared: Rc<Shared<K, R>>,
    key: K,
    // Dropping this lets the next serialized toggle on the key proceed.
    turn: Option<oneshot::Sender<()>>,
    settled: bool,
}

impl<K: Clone + Eq + Hash + Debug, R> InFlight<K, R> {
    fn settle(
        &mut self,
        outcome: Result<Option<EngagementState>, RemoteFailure>,
    ) -> Result<EngagementState, ToggleError> {
        self.settled = true;
        self.turn.take();

        let disposed = self.shared.disposed.get();
        let (result, displayed) = {
            let mut slots = self.shared.slots.borrow_mut();
            let Some(slot) = slots.get_mut(&self.key) else {
                return outcome
                    .map_err(ToggleError::from)?
                    .ok_or(ToggleError::TargetMissing);
            };

            if disposed {
                let result = match outcome {
                    Ok(Some(server)) => Ok(server),
                    Ok(None) => Ok(slot.confirmed.flipped()),
                    Err(failure) => Err(failure.into()),
                };
                return result;
            }

            slot.unacknowledged = slot.unacknowledged.saturating_sub(1);
            let result = match outcome {
                Ok(Some(server)) => {
                    slot.confirmed = server;
                    Ok(server)
                }
                Ok(None) => {
                    log::warn!(
                        "Server accepted toggle for {:?} without reporting state; keeping the optimistic value",
                        self.key
                    );
                    slot.confirmed = slot.confirmed.flipped();
                    Ok(slot.confirmed)
                }
                Err(failure) => {
                    log::warn!("Toggle for {:?} failed, rolling back: {failure}", self.key);
                    Err(ToggleError::from(failure))
                }
            };
            (result, slot.displayed())
        };

        self.shared.notify(&self.key, displayed);
        result
    }
}

impl<K: Clone + Eq + Hash + Debug, R> Drop for InFlight<K, R> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.settled = true;
        self.turn.take();
        if self.shared.disposed.get() {
            return;
        }
        let displayed = {
            let Ok(mut slots) = self.shared.slots.try_borrow_mut() else {
                log::error!("Could not roll back dropped toggle for {:?}", self.key);
                return;
            };
            let Some(slot) = slots.get_mut(&self.key) else {
                return;
            };
            slot.unacknowledged = slot.unacknowledged.saturating_sub(1);
            slot.displayed()
        };
        log::debug!("Toggle request for {:?} was dropped before it settled, rolled back", self.key);
        self.shared.notify(&self.key, displayed);
    }
}
