use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::{Errors, ProtocolError};

/// Per-session protocol state with a named phase.
pub trait SessionPhase: Sized {
    /// Placeholder held while a transition is computed.
    fn aborted() -> Self;

    fn name(&self) -> &'static str;
}

/// Concurrent map from session id to that session's state.
///
/// The map lock is only held to insert, look up, or remove a record. Each record
/// has its own mutex, so parallel sessions never wait on each other.
pub struct SessionStore<S> {
    sessions: RwLock<HashMap<String, Arc<Mutex<S>>>>,
}

impl<S> Default for SessionStore<S> {
    fn default() -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

/// Removes the session when dropped while armed, so a step that unwinds never
/// leaves its placeholder state behind.
struct DiscardOnUnwind<'a, S: SessionPhase> {
    store: &'a SessionStore<S>,
    session_id: &'a str,
    step: &'static str,
    armed: bool,
}

impl<S: SessionPhase> Drop for DiscardOnUnwind<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.store.remove(self.session_id);
            warn!(session = %self.session_id, step = self.step, "session discarded after panic");
        }
    }
}

fn lock<S>(record: &Mutex<S>) -> MutexGuard<'_, S> {
    match record.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl<S: SessionPhase> SessionStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Mutex<S>>>> {
        match self.sessions.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Mutex<S>>>> {
        match self.sessions.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn get(&self, session_id: &str) -> Result<Arc<Mutex<S>>, Errors> {
        self.read()
            .get(session_id)
            .cloned()
            .ok_or(Errors::UnknownSession)
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.read().contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn remove(&self, session_id: &str) -> bool {
        self.write().remove(session_id).is_some()
    }

    pub fn phase(&self, session_id: &str) -> Result<&'static str, Errors> {
        let record = self.get(session_id)?;
        let state = lock(&record);
        Ok(state.name())
    }

    /// Reads from the session state without changing its phase.
    pub fn inspect<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&S) -> Result<T, Errors>,
    ) -> Result<T, Errors> {
        let record = self.get(session_id)?;
        let state = lock(&record);
        f(&state)
    }

    /// Opens a new session with the state produced by `f`.
    pub fn start<T>(
        &self,
        session_id: &str,
        step: &'static str,
        f: impl FnOnce() -> Result<(S, T), Errors>,
    ) -> Result<T, ProtocolError> {
        if self.contains(session_id) {
            return Err(ProtocolError::new(session_id, step, Errors::SessionInUse));
        }
        let (state, output) = f().map_err(|e| {
            warn!(session = %session_id, step, error = %e, "session failed to start");
            ProtocolError::new(session_id, step, e)
        })?;

        let mut sessions = self.write();
        if sessions.contains_key(session_id) {
            return Err(ProtocolError::new(session_id, step, Errors::SessionInUse));
        }
        debug!(session = %session_id, step, phase = state.name(), "session started");
        sessions.insert(session_id.to_string(), Arc::new(Mutex::new(state)));
        Ok(output)
    }

    /// Moves a session out of phase `expected` through `f`.
    ///
    /// A session in any other phase is left untouched. When `f` fails or
    /// panics the session is removed.
    pub fn advance<T>(
        &self,
        session_id: &str,
        step: &'static str,
        expected: &'static str,
        f: impl FnOnce(S) -> Result<(S, T), Errors>,
    ) -> Result<T, ProtocolError> {
        let record = self
            .get(session_id)
            .map_err(|e| ProtocolError::new(session_id, step, e))?;
        let mut state = lock(&record);

        let found = state.name();
        if found != expected {
            return Err(ProtocolError::new(
                session_id,
                step,
                Errors::UnexpectedPhase { expected, found },
            ));
        }

        let current = std::mem::replace(&mut *state, S::aborted());
        let mut discard = DiscardOnUnwind {
            store: self,
            session_id,
            step,
            armed: true,
        };
        let result = f(current);
        discard.armed = false;
        match result {
            Ok((next, output)) => {
                debug!(session = %session_id, step, from = found, to = next.name(), "phase transition");
                *state = next;
                Ok(output)
            }
            Err(e) => {
                drop(state);
                self.remove(session_id);
                warn!(session = %session_id, step, error = %e, "session aborted");
                Err(ProtocolError::new(session_id, step, e))
            }
        }
    }
}
