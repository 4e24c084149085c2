//! Main-thread deferral.
//!
//! Methods flagged `main_thread` never run on the calling worker. [`wrap`]
//! turns their binding into one that packages the call as a task, hands it
//! to [`LuaContext::issue_main_thread_task`] and returns
//! [`MethodResult::Yield`]. The interpreter suspends the caller until the
//! task completes and resumes it with the task's result.
//!
//! [`MainThread`] is a ready-made executor: a task queue drained either by
//! the host's tick ([`MainThread::run_pending`]) or by a dedicated thread
//! ([`MainThread::spawn`]).

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, error};

use luabind_core::{Completer, LuaContext, LuaError, LuaResult, LuaTask, MethodResult, Pending};

use crate::family::ContextValues;
use crate::generator::Binding;

/// A broken main-thread contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("main thread method {method} returned a deferred result")]
    DeferredFromMainThread { method: String },
}

fn opaque(name: &str) -> LuaError {
    LuaError::internal(format!("Internal error in {name}"))
}

/// Defer every call of `binding` to the main thread.
///
/// If the wrapped method ever yields, the binding is poisoned: that call and
/// every later one fail.
pub fn wrap<C: ContextValues>(binding: Binding<C>, name: Arc<str>) -> Binding<C> {
    let poisoned = Arc::new(AtomicBool::new(false));

    Binding::<C>::new(move |target, context, arguments| {
        if poisoned.load(Ordering::Acquire) {
            return Err(opaque(&name));
        }

        let arguments = arguments.escapes()?;
        let target = Arc::clone(target);
        let task_context = context.clone();
        let inner = binding.clone();
        let poisoned = Arc::clone(&poisoned);
        let name = Arc::clone(&name);

        let task: LuaTask = Box::new(move || {
            let result = inner.apply(&target, &task_context, &arguments)?;
            if result.is_yield() {
                poisoned.store(true, Ordering::Release);
                let violation = IntegrityError::DeferredFromMainThread {
                    method: name.to_string(),
                };
                error!(target: "luabind::main_thread", "{violation}");
                return Err(opaque(&name));
            }
            Ok(result)
        });

        let pending = context.lua_context().issue_main_thread_task(task)?;
        Ok(MethodResult::Yield(pending))
    })
}

// ============================================================================
// Executor
// ============================================================================

struct Job {
    task: LuaTask,
    completer: Completer,
}

impl Job {
    fn run(self) {
        let id = self.completer.id();
        let result = panic::catch_unwind(AssertUnwindSafe(self.task)).unwrap_or_else(|_| {
            error!(target: "luabind::main_thread", task = id, "main thread task panicked");
            Err(LuaError::internal(format!("task {id} failed")))
        });
        self.completer.complete(result);
    }
}

enum Message {
    Run(Job),
    Shutdown,
}

/// A single-consumer queue of main-thread tasks.
pub struct MainThread {
    tx: Sender<Message>,
    rx: Receiver<Message>,
    next_id: AtomicU64,
    /// Held for reading while a task is sent, so no task lands behind the
    /// shutdown drain.
    closed: RwLock<bool>,
}

impl MainThread {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        Arc::new(Self {
            tx,
            rx,
            next_id: AtomicU64::new(1),
            closed: RwLock::new(false),
        })
    }

    /// Queue `task`, returning the handle its result arrives on.
    pub fn enqueue(&self, task: LuaTask) -> LuaResult<Pending> {
        let closed = self.closed.read();
        if *closed {
            return Err(LuaError::new("main thread is shut down"));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (completer, pending) = Pending::channel(id);
        self.tx
            .send(Message::Run(Job { task, completer }))
            .map_err(|_| LuaError::new("main thread is shut down"))?;
        drop(closed);
        debug!(target: "luabind::main_thread", task = id, "queued main thread task");
        Ok(pending)
    }

    /// Run up to `budget` queued tasks on the current thread.
    ///
    /// Returns the number of tasks run.
    pub fn run_pending(&self, budget: usize) -> usize {
        let mut ran = 0;
        while ran < budget {
            match self.rx.try_recv() {
                Ok(Message::Run(job)) => {
                    job.run();
                    ran += 1;
                }
                Ok(Message::Shutdown) | Err(_) => break,
            }
        }
        ran
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    pub fn is_shut_down(&self) -> bool {
        *self.closed.read()
    }

    /// Drain the queue on a dedicated thread until shut down.
    pub fn spawn(self: &Arc<Self>) -> io::Result<MainThreadHandle> {
        let executor = Arc::clone(self);
        let thread = thread::Builder::new()
            .name("luabind-main".to_owned())
            .spawn(move || {
                for message in executor.rx.iter() {
                    match message {
                        Message::Run(job) => job.run(),
                        Message::Shutdown => break,
                    }
                }
                executor.cancel_queued();
            })?;
        Ok(MainThreadHandle {
            executor: Arc::clone(self),
            thread: Some(thread),
        })
    }

    /// Refuse new tasks and cancel queued ones.
    pub fn shutdown(&self) {
        {
            let mut closed = self.closed.write();
            if *closed {
                return;
            }
            *closed = true;
        }
        self.cancel_queued();
        // Both channel ends live in `self`, so the send cannot fail.
        let _ = self.tx.send(Message::Shutdown);
    }

    fn cancel_queued(&self) {
        let mut cancelled = 0;
        while let Ok(message) = self.rx.try_recv() {
            if let Message::Run(job) = message {
                drop(job);
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(target: "luabind::main_thread", cancelled, "cancelled queued main thread tasks");
        }
    }
}

/// Owns the dedicated thread started by [`MainThread::spawn`]. Dropping it
/// shuts the executor down and joins the thread.
pub struct MainThreadHandle {
    executor: Arc<MainThread>,
    thread: Option<JoinHandle<()>>,
}

impl MainThreadHandle {
    pub fn executor(&self) -> &Arc<MainThread> {
        &self.executor
    }

    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.executor.shutdown();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!(target: "luabind::main_thread", "main thread executor panicked");
            }
        }
    }
}

impl Drop for MainThreadHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A [`LuaContext`] backed by a [`MainThread`].
#[derive(Clone)]
pub struct MainThreadContext {
    executor: Arc<MainThread>,
}

impl MainThreadContext {
    pub fn new(executor: Arc<MainThread>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<MainThread> {
        &self.executor
    }
}

impl LuaContext for MainThreadContext {
    fn issue_main_thread_task(&self, task: LuaTask) -> LuaResult<Pending> {
        self.executor.enqueue(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::family::LuaCtx;
    use luabind_core::{LuaObject, ObjectArguments, Value};

    struct Unit;

    impl LuaObject for Unit {}

    fn context(executor: &Arc<MainThread>) -> LuaCtx {
        (Arc::new(MainThreadContext::new(Arc::clone(executor))),)
    }

    fn thread_name() -> Binding<LuaCtx> {
        Binding::<LuaCtx>::new(|_, _, _| {
            let name = thread::current().name().unwrap_or_default().to_owned();
            Ok(MethodResult::of(name))
        })
    }

    #[test]
    fn calls_yield_until_the_tick_runs() {
        let executor = MainThread::new();
        let binding = wrap(thread_name(), "Unit.name".into());
        let target: Arc<dyn LuaObject> = Arc::new(Unit);

        let result = binding
            .apply(&target, &context(&executor), &ObjectArguments::default())
            .unwrap();
        let MethodResult::Yield(pending) = result else {
            panic!("expected a yield");
        };
        assert_eq!(executor.pending(), 1);
        let pending = pending.try_resume().unwrap_err();

        assert_eq!(executor.run_pending(8), 1);
        let values = pending.wait().unwrap().into_values();
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn spawned_executor_runs_on_its_own_thread() {
        let executor = MainThread::new();
        let handle = executor.spawn().unwrap();
        let binding = wrap(thread_name(), "Unit.name".into());
        let target: Arc<dyn LuaObject> = Arc::new(Unit);

        let values = binding
            .apply(&target, &context(&executor), &ObjectArguments::default())
            .unwrap()
            .resolve()
            .unwrap();
        assert_eq!(values, vec![Value::from("luabind-main")]);
        handle.shutdown();
    }

    #[test]
    fn yielding_inner_methods_poison_the_binding() {
        let executor = MainThread::new();
        let inner = Binding::<LuaCtx>::new(|_, context, _| {
            let pending = context
                .0
                .issue_main_thread_task(Box::new(|| Ok(MethodResult::empty())))?;
            Ok(MethodResult::Yield(pending))
        });
        let binding = wrap(inner, "Unit.bad".into());
        let target: Arc<dyn LuaObject> = Arc::new(Unit);
        let context = context(&executor);

        let first = binding
            .apply(&target, &context, &ObjectArguments::default())
            .unwrap();
        executor.run_pending(1);
        let MethodResult::Yield(pending) = first else {
            panic!("expected a yield");
        };
        assert!(pending.wait().unwrap_err().is_internal());

        let second = binding.apply(&target, &context, &ObjectArguments::default());
        assert!(second.unwrap_err().is_internal());
    }

    #[test]
    fn shutdown_cancels_queued_tasks() {
        let executor = MainThread::new();
        let pending = executor
            .enqueue(Box::new(|| Ok(MethodResult::empty())))
            .unwrap();
        executor.shutdown();
        assert_eq!(pending.wait().unwrap_err().message(), "task 1 cancelled");
        assert!(executor.enqueue(Box::new(|| Ok(MethodResult::empty()))).is_err());
    }

    #[test]
    fn tasks_racing_shutdown_always_resolve() {
        let executor = MainThread::new();
        let handle = executor.spawn().unwrap();

        let submitters: Vec<_> = (0..4)
            .map(|_| {
                let executor = Arc::clone(&executor);
                thread::spawn(move || {
                    (0..200)
                        .filter_map(|_| {
                            executor
                                .enqueue(Box::new(|| Ok(MethodResult::empty())))
                                .ok()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handle.shutdown();

        for submitter in submitters {
            for pending in submitter.join().unwrap() {
                assert!(pending.wait_timeout(Duration::from_secs(5)).is_ok());
            }
        }
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn panicking_tasks_fail_their_caller() {
        let executor = MainThread::new();
        let pending = executor
            .enqueue(Box::new(|| -> LuaResult<MethodResult> { panic!("boom") }))
            .unwrap();
        executor.run_pending(1);
        assert!(pending.wait().unwrap_err().is_internal());
    }
}
