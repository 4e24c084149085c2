//! Method results and deferred completions.
//!
//! A binding returns a [`MethodResult`]. Most results are immediate values;
//! [`MethodResult::Yield`] instead carries a [`Pending`] completion, telling
//! the interpreter to suspend the calling script until the paired
//! [`Completer`] delivers the final result.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::{LuaError, LuaResult};
use crate::value::{IntoLua, Value};

/// The outcome of a successful call.
pub enum MethodResult {
    /// No return values.
    Empty,
    Single(Value),
    Many(Vec<Value>),
    /// Suspend the caller until the completion resolves.
    Yield(Pending),
}

impl MethodResult {
    pub fn empty() -> Self {
        MethodResult::Empty
    }

    pub fn of(value: impl IntoLua) -> Self {
        MethodResult::Single(value.into_lua())
    }

    pub fn of_many(values: Vec<Value>) -> Self {
        MethodResult::Many(values)
    }

    pub fn pending(pending: Pending) -> Self {
        MethodResult::Yield(pending)
    }

    pub fn is_yield(&self) -> bool {
        matches!(self, MethodResult::Yield(_))
    }

    /// The immediate return values; empty for a yield.
    pub fn values(&self) -> &[Value] {
        match self {
            MethodResult::Empty | MethodResult::Yield(_) => &[],
            MethodResult::Single(v) => std::slice::from_ref(v),
            MethodResult::Many(v) => v,
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        match self {
            MethodResult::Empty | MethodResult::Yield(_) => Vec::new(),
            MethodResult::Single(v) => vec![v],
            MethodResult::Many(v) => v,
        }
    }

    /// Resolve any yield by blocking on it, then return the values.
    pub fn resolve(self) -> LuaResult<Vec<Value>> {
        match self {
            MethodResult::Yield(pending) => pending.wait()?.resolve(),
            other => Ok(other.into_values()),
        }
    }
}

impl fmt::Debug for MethodResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodResult::Empty => f.write_str("Empty"),
            MethodResult::Single(v) => f.debug_tuple("Single").field(v).finish(),
            MethodResult::Many(v) => f.debug_tuple("Many").field(v).finish(),
            MethodResult::Yield(p) => f.debug_tuple("Yield").field(p).finish(),
        }
    }
}

// ============================================================================
// Pending completions
// ============================================================================

type Slot = LuaResult<MethodResult>;

fn cancelled(id: u64) -> LuaError {
    LuaError::new(format!("task {id} cancelled"))
}

/// The receiving half of a deferred result.
pub struct Pending {
    id: u64,
    rx: Receiver<Slot>,
}

/// The sending half of a deferred result. Dropping it unsent cancels the
/// pending side.
pub struct Completer {
    id: u64,
    tx: Sender<Slot>,
}

impl Pending {
    /// Create a linked completer/pending pair for task `id`.
    pub fn channel(id: u64) -> (Completer, Pending) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (Completer { id, tx }, Pending { id, rx })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_ready(&self) -> bool {
        !self.rx.is_empty()
    }

    /// Take the result if it has arrived, otherwise hand the pending back.
    pub fn try_resume(self) -> Result<Slot, Pending> {
        match self.rx.try_recv() {
            Ok(slot) => Ok(slot),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Disconnected) => Ok(Err(cancelled(self.id))),
        }
    }

    /// Block until the result arrives.
    pub fn wait(self) -> Slot {
        self.rx.recv().unwrap_or_else(|_| Err(cancelled(self.id)))
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<Slot, Pending> {
        match self.rx.recv_timeout(timeout) {
            Ok(slot) => Ok(slot),
            Err(RecvTimeoutError::Timeout) => Err(self),
            Err(RecvTimeoutError::Disconnected) => Ok(Err(cancelled(self.id))),
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("id", &self.id)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Completer {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn complete(self, result: Slot) {
        // The pending side may already be gone; nothing is waiting then.
        let _ = self.tx.send(result);
    }
}

impl fmt::Debug for Completer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_view_matches_variant() {
        assert!(MethodResult::empty().values().is_empty());
        assert_eq!(MethodResult::of(5).values(), &[Value::from(5)]);
        assert_eq!(
            MethodResult::of_many(vec![Value::Nil, Value::from(1)]).into_values(),
            vec![Value::Nil, Value::from(1)]
        );
    }

    #[test]
    fn pending_resumes_after_completion() {
        let (completer, pending) = Pending::channel(7);
        let pending = pending.try_resume().unwrap_err();
        assert!(!pending.is_ready());
        completer.complete(Ok(MethodResult::of("done")));
        let result = pending.try_resume().unwrap().unwrap();
        assert_eq!(result.values(), &[Value::from("done")]);
    }

    #[test]
    fn dropped_completer_cancels() {
        let (completer, pending) = Pending::channel(3);
        drop(completer);
        assert_eq!(pending.wait().unwrap_err().message(), "task 3 cancelled");
    }
}
