//! Execution contexts: the background pool and the serial main context.
//!
//! ## Two contexts
//!
//! * **Background**: the tokio blocking pool. Remote byte loads block a
//!   thread for the whole transfer and image/PDF decoding is CPU-bound, so
//!   both run via `spawn_blocking`, never on an async worker or on the host's
//!   UI thread.
//! * **Main**: a single serial queue ([`MainQueue`] / [`MainLoop`]) drained
//!   by the host on its UI thread. Every document state change and every
//!   view mutation for a remote load is posted here, so observers always run
//!   on the thread that owns the UI.
//!
//! ## Deterministic mode
//!
//! [`ExecutionPolicy::Immediate`] collapses both hops into inline calls on
//! the calling thread. Tests use it to observe every state transition before
//! `load_source()` returns; production code uses
//! [`ExecutionPolicy::Dispatched`], typically obtained from
//! [`ViewerRuntime::policy`].

use crate::config::ViewerConfig;
use crate::error::DocViewError;
use std::fmt;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A unit of work posted to the main context.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Sending half of the main context. Cheap to clone.
#[derive(Clone)]
pub struct MainQueue {
    tx: mpsc::UnboundedSender<Job>,
}

impl MainQueue {
    /// Queue `job` to run on the main context.
    ///
    /// If the [`MainLoop`] has been dropped the job is discarded; there is no
    /// longer a UI to update.
    pub fn post(&self, job: impl FnOnce() + Send + 'static) {
        if self.tx.send(Box::new(job)).is_err() {
            warn!("Main loop has been dropped; discarding posted job");
        }
    }
}

impl fmt::Debug for MainQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainQueue")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Receiving half of the main context, driven by the host's UI thread.
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl MainLoop {
    /// Run jobs until every [`MainQueue`] (including those held by loaders
    /// and [`ViewerRuntime`]) has been dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            job();
        }
        debug!("Main loop finished: all queues dropped");
    }

    /// Wait for and run a single job. Returns `false` once every queue is gone.
    pub async fn run_one(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Blocking variant of [`MainLoop::run_one`] for hosts whose UI thread is
    /// not async. Must not be called from inside an async task.
    pub fn blocking_run_one(&mut self) -> bool {
        match self.rx.blocking_recv() {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run every job already queued without waiting. Returns how many ran.
    ///
    /// Suited to hosts that pump the queue once per frame.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }
}

impl fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MainLoop").finish_non_exhaustive()
    }
}

/// Create a connected main-context pair.
pub fn main_context() -> (MainQueue, MainLoop) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MainQueue { tx }, MainLoop { rx })
}

/// How loaders hop between contexts.
#[derive(Clone)]
pub enum ExecutionPolicy {
    /// Blocking work on `background`'s blocking pool, completions on `main`.
    Dispatched { background: Handle, main: MainQueue },
    /// Every hop runs inline on the calling thread.
    Immediate,
}

impl ExecutionPolicy {
    pub fn dispatched(background: Handle, main: MainQueue) -> Self {
        ExecutionPolicy::Dispatched { background, main }
    }

    /// Run blocking `job` off the main context.
    pub fn run_in_background(&self, job: impl FnOnce() + Send + 'static) {
        match self {
            ExecutionPolicy::Dispatched { background, .. } => {
                // Detached: loads are not cancellable.
                drop(background.spawn_blocking(job));
            }
            ExecutionPolicy::Immediate => job(),
        }
    }

    /// Run `job` on the main context.
    pub fn run_on_main(&self, job: impl FnOnce() + Send + 'static) {
        match self {
            ExecutionPolicy::Dispatched { main, .. } => main.post(job),
            ExecutionPolicy::Immediate => job(),
        }
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self, ExecutionPolicy::Immediate)
    }
}

impl fmt::Debug for ExecutionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionPolicy::Dispatched { main, .. } => f
                .debug_struct("Dispatched")
                .field("main", main)
                .finish_non_exhaustive(),
            ExecutionPolicy::Immediate => f.write_str("Immediate"),
        }
    }
}

/// Owns the bounded background pool and the main queue of a host.
///
/// Drop it outside of async code, or call
/// [`ViewerRuntime::shutdown_background`] when inside one.
pub struct ViewerRuntime {
    runtime: Runtime,
    main: MainQueue,
}

impl ViewerRuntime {
    /// Build the background pool (at most `config.max_background_threads`
    /// blocking threads) and the main context.
    pub fn new(config: &ViewerConfig) -> Result<(Self, MainLoop), DocViewError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(config.max_background_threads)
            .thread_name("docview-background")
            .enable_all()
            .build()
            .map_err(DocViewError::RuntimeBuild)?;

        let (main, main_loop) = main_context();
        debug!(
            "Viewer runtime started ({} background threads max)",
            config.max_background_threads
        );
        Ok((Self { runtime, main }, main_loop))
    }

    /// The production policy: background pool + this runtime's main queue.
    pub fn policy(&self) -> ExecutionPolicy {
        ExecutionPolicy::dispatched(self.runtime.handle().clone(), self.main.clone())
    }

    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    pub fn main_queue(&self) -> MainQueue {
        self.main.clone()
    }

    /// Shut the pool down without waiting for in-flight loads.
    pub fn shutdown_background(self) {
        self.runtime.shutdown_background();
    }
}

impl fmt::Debug for ViewerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerRuntime")
            .field("main", &self.main)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn immediate_runs_inline() {
        let ran = Arc::new(AtomicUsize::new(0));
        let policy = ExecutionPolicy::Immediate;

        let r = Arc::clone(&ran);
        policy.run_in_background(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });
        let r = Arc::clone(&ran);
        policy.run_on_main(move || {
            r.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(ran.load(Ordering::SeqCst), 2);
        assert!(policy.is_immediate());
    }

    #[test]
    fn main_queue_defers_until_pumped() {
        let (queue, mut main_loop) = main_context();
        let ran = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let r = Arc::clone(&ran);
            queue.post(move || {
                r.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(main_loop.run_pending(), 3);
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert_eq!(main_loop.run_pending(), 0);
    }

    #[test]
    fn main_loop_ends_when_queues_drop() {
        let (queue, mut main_loop) = main_context();
        queue.post(|| {});
        drop(queue);
        assert!(main_loop.blocking_run_one());
        assert!(!main_loop.blocking_run_one());
    }

    #[test]
    fn post_after_loop_dropped_is_harmless() {
        let (queue, main_loop) = main_context();
        drop(main_loop);
        queue.post(|| panic!("must not run"));
    }

    #[test]
    fn dispatched_background_hops_to_main_thread() {
        let config = ViewerConfig::builder()
            .max_background_threads(2)
            .build()
            .unwrap();
        let (runtime, mut main_loop) = ViewerRuntime::new(&config).unwrap();
        let policy = runtime.policy();
        let main_thread = thread::current().id();

        let seen = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen_bg = Arc::clone(&seen);
        let hop = policy.clone();
        policy.run_in_background(move || {
            seen_bg.lock().push(thread::current().id() != main_thread);
            let seen_main = Arc::clone(&seen_bg);
            hop.run_on_main(move || {
                seen_main.lock().push(thread::current().id() == main_thread);
            });
        });

        assert!(main_loop.blocking_run_one());
        assert_eq!(*seen.lock(), vec![true, true]);
    }
}
