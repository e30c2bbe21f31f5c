//! Grouped parallel-for dispatch over a `rayon` worker pool.
//!
//! A [`JobSystem`] owns the pool. Work is submitted through a [`Context`]
//! that only exists inside [`JobSystem::scope`]:
//!
//! - [`Context::dispatch`] splits `job_count` items into groups of
//!   `group_size` and queues one task per group. It returns immediately.
//! - [`Context::wait`] blocks until every group queued on that context has
//!   finished, running other queued work in the meantime.
//! - Leaving the scope waits as well, so a scope is one pipeline stage and
//!   its end is the barrier before the next stage.
//!
//! With zero worker threads there is no pool and every dispatch runs inline
//! on the calling thread before returning.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use vesper_engine::jobs::JobSystem;
//!
//! let jobs = JobSystem::with_threads(2).unwrap();
//! let sum = AtomicU32::new(0);
//! jobs.scope(|ctx| {
//!     ctx.dispatch(100, 16, |args| {
//!         sum.fetch_add(args.job_index, Ordering::Relaxed);
//!     });
//!     ctx.wait();
//! });
//! assert_eq!(sum.load(Ordering::Relaxed), (0..100).sum::<u32>());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::JobSystemConfig;

// ---------------------------------------------------------------------------
// JobArgs
// ---------------------------------------------------------------------------

/// Position of one item within a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobArgs {
    /// Index of the item in `0..job_count`.
    pub job_index: u32,
    /// Which group the item was scheduled in.
    pub group_id: u32,
    /// Index of the item inside its group.
    pub group_index: u32,
}

/// Failure to start the worker pool.
#[derive(Debug, thiserror::Error)]
pub enum JobSystemError {
    #[error("failed to build worker pool: {0}")]
    PoolBuild(#[from] rayon::ThreadPoolBuildError),
}

// ---------------------------------------------------------------------------
// JobSystem
// ---------------------------------------------------------------------------

/// Owner of the worker threads used by the update pipeline.
pub struct JobSystem {
    pool: Option<rayon::ThreadPool>,
}

impl std::fmt::Debug for JobSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSystem")
            .field("worker_threads", &self.worker_count())
            .finish()
    }
}

impl Default for JobSystem {
    fn default() -> Self {
        Self::inline()
    }
}

impl JobSystem {
    /// Build from configuration; `worker_threads == 0` runs inline.
    pub fn new(config: &JobSystemConfig) -> Result<Self, JobSystemError> {
        Self::with_threads(config.worker_threads)
    }

    pub fn with_threads(worker_threads: usize) -> Result<Self, JobSystemError> {
        if worker_threads == 0 {
            return Ok(Self::inline());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("vesper-worker-{i}"))
            .build()?;
        tracing::debug!(worker_threads, "job system started");
        Ok(Self { pool: Some(pool) })
    }

    /// A job system without worker threads.
    pub fn inline() -> Self {
        Self { pool: None }
    }

    /// Number of worker threads, 0 when running inline.
    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map_or(0, rayon::ThreadPool::current_num_threads)
    }

    /// Run `f` with a fresh [`Context`] and wait for everything it dispatched.
    ///
    /// Jobs may borrow anything that outlives the call. A panic inside a job
    /// is propagated to the caller once the scope has drained.
    pub fn scope<'scope, R, F>(&self, f: F) -> R
    where
        F: for<'ctx> FnOnce(&Context<'ctx, 'scope>) -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.scope(|scope| {
                let ctx = Context {
                    scope: Some(scope),
                    pending: Arc::default(),
                };
                f(&ctx)
            }),
            None => {
                let ctx = Context {
                    scope: None,
                    pending: Arc::default(),
                };
                f(&ctx)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Handle for queueing grouped work inside [`JobSystem::scope`].
pub struct Context<'ctx, 'scope> {
    scope: Option<&'ctx rayon::Scope<'scope>>,
    pending: Arc<AtomicUsize>,
}

/// Decrements the pending group count even if the task panics.
struct GroupGuard(Arc<AtomicUsize>);

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl<'ctx, 'scope> Context<'ctx, 'scope> {
    /// Queue `task` for every index in `0..job_count`, `group_size` per task.
    ///
    /// A zero count dispatches nothing. A zero group size runs one item per
    /// group.
    pub fn dispatch<F>(&self, job_count: u32, group_size: u32, task: F)
    where
        F: Fn(JobArgs) + Send + Sync + 'scope,
    {
        if job_count == 0 {
            return;
        }
        let group_size = group_size.max(1);
        let group_count = job_count.div_ceil(group_size);

        let Some(scope) = self.scope else {
            for group_id in 0..group_count {
                run_group(&task, group_id, group_size, job_count);
            }
            return;
        };

        let task = Arc::new(task);
        self.pending.fetch_add(group_count as usize, Ordering::AcqRel);
        for group_id in 0..group_count {
            let task = Arc::clone(&task);
            let guard = GroupGuard(Arc::clone(&self.pending));
            scope.spawn(move |_| {
                let _guard = guard;
                run_group(&*task, group_id, group_size, job_count);
            });
        }
    }

    /// Queue `task` for every element of `items`, `group_size` per task.
    ///
    /// Each group owns a disjoint chunk of the slice, so tasks may mutate
    /// their element without synchronization. A zero group size runs one
    /// item per group.
    pub fn dispatch_slice_mut<T, F>(&self, items: &'scope mut [T], group_size: u32, task: F)
    where
        T: Send + 'scope,
        F: Fn(JobArgs, &mut T) + Send + Sync + 'scope,
    {
        if items.is_empty() {
            return;
        }
        let group_size = group_size.max(1);
        assert!(
            u32::try_from(items.len()).is_ok(),
            "cannot dispatch {} items",
            items.len()
        );

        let Some(scope) = self.scope else {
            for (group_id, chunk) in items.chunks_mut(group_size as usize).enumerate() {
                run_chunk(&task, group_id as u32, group_size, chunk);
            }
            return;
        };

        let task = Arc::new(task);
        for (group_id, chunk) in items.chunks_mut(group_size as usize).enumerate() {
            self.pending.fetch_add(1, Ordering::AcqRel);
            let task = Arc::clone(&task);
            let guard = GroupGuard(Arc::clone(&self.pending));
            scope.spawn(move |_| {
                let _guard = guard;
                run_chunk(&*task, group_id as u32, group_size, chunk);
            });
        }
    }

    /// Whether any group queued on this context is still running.
    pub fn is_busy(&self) -> bool {
        self.pending.load(Ordering::Acquire) > 0
    }

    /// Block until every group queued on this context has finished.
    ///
    /// The calling thread helps by running other queued jobs while it waits.
    pub fn wait(&self) {
        while self.is_busy() {
            match rayon::yield_now() {
                Some(rayon::Yield::Executed) => {}
                _ => std::thread::yield_now(),
            }
        }
    }
}

fn run_group<F: Fn(JobArgs)>(task: &F, group_id: u32, group_size: u32, job_count: u32) {
    let begin = group_id * group_size;
    let end = begin.saturating_add(group_size).min(job_count);
    for job_index in begin..end {
        task(JobArgs {
            job_index,
            group_id,
            group_index: job_index - begin,
        });
    }
}

fn run_chunk<T, F: Fn(JobArgs, &mut T)>(task: &F, group_id: u32, group_size: u32, chunk: &mut [T]) {
    let begin = group_id * group_size;
    for (group_index, item) in chunk.iter_mut().enumerate() {
        let group_index = group_index as u32;
        task(
            JobArgs {
                job_index: begin + group_index,
                group_id,
                group_index,
            },
            item,
        );
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
