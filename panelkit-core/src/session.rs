use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::disposable::Disposable;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of one show-to-resolution cycle.
///
/// `Created → PanelOpen → {Disposed | Submitted}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Created,
    PanelOpen,
    Disposed,
    Submitted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Disposed | SessionState::Submitted)
    }
}

/// Outcome that ends a session.
#[derive(Debug)]
pub enum Resolution<R> {
    Disposed,
    Submitted(R),
}

/// Holds the single pending result of a `show()` call and guards it so it
/// resolves exactly once, whichever of disposal or submit gets there first.
pub struct Session<R> {
    id: u64,
    state: Mutex<SessionState>,
    resolver: Mutex<Option<oneshot::Sender<Option<R>>>>,
    dispose_listener: Mutex<Option<Disposable>>,
}

impl<R> Session<R> {
    pub fn new() -> (Arc<Self>, PendingResult<R>) {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        let session = Arc::new(Self {
            id,
            state: Mutex::new(SessionState::Created),
            resolver: Mutex::new(Some(tx)),
            dispose_listener: Mutex::new(None),
        });
        (session, PendingResult { session_id: id, rx })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    pub fn is_open(&self) -> bool {
        self.state() == SessionState::PanelOpen
    }

    /// Record that the panel now exists. Only valid from `Created`.
    pub fn mark_open(&self) -> Result<(), String> {
        let mut state = self.state.lock();
        if *state != SessionState::Created {
            return Err(format!(
                "Session {} cannot open from state {:?}",
                self.id, *state
            ));
        }
        *state = SessionState::PanelOpen;
        Ok(())
    }

    pub fn set_dispose_listener(&self, listener: Disposable) {
        if let Some(previous) = self.dispose_listener.lock().replace(listener) {
            previous.dispose();
        }
    }

    /// Detach the panel-disposal observer so it cannot race a submit.
    pub fn release_dispose_listener(&self) {
        let listener = self.dispose_listener.lock().take();
        if let Some(listener) = listener {
            listener.dispose();
        }
    }

    /// Settle the session. Returns `false` (and does nothing) unless the
    /// session is currently `PanelOpen`.
    pub fn resolve(&self, resolution: Resolution<R>) -> bool {
        let (terminal, value) = match resolution {
            Resolution::Disposed => (SessionState::Disposed, None),
            Resolution::Submitted(v) => (SessionState::Submitted, Some(v)),
        };
        {
            let mut state = self.state.lock();
            if *state != SessionState::PanelOpen {
                log::debug!(
                    "Session {} already {:?}, ignoring {:?}",
                    self.id,
                    *state,
                    terminal
                );
                return false;
            }
            *state = terminal;
        }

        log::debug!("Session {} resolved: {:?}", self.id, terminal);
        if let Some(tx) = self.resolver.lock().take() {
            // The caller may have stopped waiting; that is not an error
            let _ = tx.send(value);
        }
        true
    }
}

impl<R> std::fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Caller side of a session: resolves to `Some(result)` after an accepted
/// submit, or `None` once the panel is closed without one.
#[derive(Debug)]
pub struct PendingResult<R> {
    session_id: u64,
    rx: oneshot::Receiver<Option<R>>,
}

impl<R> PendingResult<R> {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub async fn wait(self) -> Option<R> {
        // A dropped session can never resolve; treat it like a closed panel
        self.rx.await.unwrap_or(None)
    }

    /// Non-blocking check. `None` while the session is still open.
    pub fn try_result(&mut self) -> Option<Option<R>> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(None),
        }
    }
}
