//! Per-call context values supplied by the host runtime.

use std::sync::Arc;

use crate::error::LuaResult;
use crate::result::{MethodResult, Pending};
use crate::value::Value;

/// Work queued for the main thread.
pub type LuaTask = Box<dyn FnOnce() -> LuaResult<MethodResult> + Send + 'static>;

/// The calling computer's view of the runtime.
pub trait LuaContext: Send + Sync {
    /// Queue `task` on the main thread. The returned [`Pending`] resolves
    /// with the task's result once it has run.
    fn issue_main_thread_task(&self, task: LuaTask) -> LuaResult<Pending>;
}

/// A computer that a peripheral is attached to.
pub trait ComputerAccess: Send + Sync {
    fn id(&self) -> u32;

    /// The name the peripheral is attached under (a side or network name).
    fn attachment_name(&self) -> &str;

    fn queue_event(&self, event: &str, arguments: Vec<Value>);
}

impl std::fmt::Debug for dyn LuaContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LuaContext")
    }
}

impl std::fmt::Debug for dyn ComputerAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputerAccess")
            .field("id", &self.id())
            .field("attachment_name", &self.attachment_name())
            .finish()
    }
}

/// Shared handle to a [`LuaContext`].
pub type LuaContextRef = Arc<dyn LuaContext>;

/// Shared handle to a [`ComputerAccess`].
pub type ComputerRef = Arc<dyn ComputerAccess>;
