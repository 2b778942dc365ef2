//! Finalized head tracking for the live relay loops.

use archivist_protocol::BlockNumber;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors raised by a [`ChainHeadTracker`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TrackerError {
    /// A live waiter is already registered.
    #[error("a waiter is already registered")]
    WaiterAlreadyRegistered,
    /// The waiter was dropped without being woken.
    #[error("waiter dropped before being woken")]
    WaiterDropped,
}

/// What is known about a chain's head.
#[derive(Debug)]
pub enum ChainHeadState {
    /// A chain with its own finality, fed by a finalized head subscription.
    Primary {
        /// The highest finalized block number seen, if any.
        last_finalized: Option<BlockNumber>,
        /// The relay loop waiting for the next update.
        waiter: Option<oneshot::Sender<()>>,
    },
    /// A chain whose finality follows the primary chain. Its loop re-queries the finalized
    /// number itself and only uses the tracker as a wake-up signal.
    Parachain {
        /// The relay loop waiting for the next update.
        waiter: Option<oneshot::Sender<()>>,
    },
}

impl ChainHeadState {
    fn waiter(&mut self) -> &mut Option<oneshot::Sender<()>> {
        match self {
            Self::Primary { waiter, .. } | Self::Parachain { waiter } => waiter,
        }
    }

    fn fire(&mut self) {
        if let Some(waiter) = self.waiter().take() {
            // The receiver may be gone; there is nobody left to wake then.
            let _ = waiter.send(());
        }
    }

    fn register(&mut self) -> Result<oneshot::Receiver<()>, TrackerError> {
        let slot = self.waiter();
        if slot.as_ref().is_some_and(|waiter| !waiter.is_closed()) {
            return Err(TrackerError::WaiterAlreadyRegistered);
        }
        let (tx, rx) = oneshot::channel();
        *slot = Some(tx);
        Ok(rx)
    }
}

/// A shared handle to a [`ChainHeadState`] with a single waiter slot.
///
/// The relay loop registers itself as the waiter; the head subscription wakes it. Registering a
/// second waiter while the first one is still alive is an error, a waiter whose receiver was
/// dropped is replaced.
#[derive(Debug, Clone)]
pub struct ChainHeadTracker {
    state: Arc<Mutex<ChainHeadState>>,
}

impl ChainHeadTracker {
    /// A tracker for a primary chain with no finalized head seen yet.
    pub fn primary() -> Self {
        Self::from_state(ChainHeadState::Primary { last_finalized: None, waiter: None })
    }

    /// A tracker for a parachain.
    pub fn parachain() -> Self {
        Self::from_state(ChainHeadState::Parachain { waiter: None })
    }

    fn from_state(state: ChainHeadState) -> Self {
        Self { state: Arc::new(Mutex::new(state)) }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut ChainHeadState) -> T) -> T {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Records a new finalized head and wakes the waiter.
    ///
    /// A primary tracker keeps the highest number it has seen.
    pub fn update(&self, number: BlockNumber) {
        self.with_state(|state| {
            if let ChainHeadState::Primary { last_finalized, .. } = state {
                *last_finalized = Some(last_finalized.map_or(number, |last| last.max(number)));
            }
            state.fire();
        })
    }

    /// Wakes the waiter without recording anything.
    pub fn notify(&self) {
        self.with_state(ChainHeadState::fire)
    }

    /// The highest finalized number seen by a primary tracker.
    pub fn last_finalized(&self) -> Option<BlockNumber> {
        self.with_state(|state| match state {
            ChainHeadState::Primary { last_finalized, .. } => *last_finalized,
            ChainHeadState::Parachain { .. } => None,
        })
    }

    /// Registers the waiter woken by the next [`Self::update`] or [`Self::notify`].
    pub fn register_waiter(&self) -> Result<oneshot::Receiver<()>, TrackerError> {
        self.with_state(ChainHeadState::register)
    }

    /// Waits for the next [`Self::update`] or [`Self::notify`].
    pub async fn wait(&self) -> Result<(), TrackerError> {
        let waiter = self.register_waiter()?;
        waiter.await.map_err(|_| TrackerError::WaiterDropped)
    }

    /// Waits until the finalized head is at or past `next` and returns it.
    ///
    /// The check and the waiter registration happen under the same lock, so an update racing
    /// with this call is never missed. A parachain tracker never reports a finalized number, so
    /// this only makes sense for a primary tracker.
    pub async fn wait_until_past(&self, next: BlockNumber) -> Result<BlockNumber, TrackerError> {
        loop {
            let waiter = self.with_state(|state| {
                if let ChainHeadState::Primary { last_finalized: Some(last), .. } = state {
                    if *last >= next {
                        return Ok(Err(*last));
                    }
                }
                state.register().map(Ok)
            })?;

            match waiter {
                Ok(waiter) => waiter.await.map_err(|_| TrackerError::WaiterDropped)?,
                Err(last_finalized) => return Ok(last_finalized),
            }
        }
    }
}
