//! Background execution for generation and rescale requests.
//!
//! Work runs on the rayon global pool. Results come back as closures posted to
//! a [`MainThreadQueue`], which the controlling thread drains with whatever
//! context it owns (a Bevy `World`, a CLI state struct, a test fixture).

use crate::error::{Result, TerrainError};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_in_progress(self) -> bool {
        self == JobStatus::InProgress
    }
}

type Completion<C> = Box<dyn FnOnce(&mut C) + Send>;

/// Receiving end of the completion channel. Owned by the controlling thread.
pub struct MainThreadQueue<C> {
    sender: Sender<Completion<C>>,
    receiver: Receiver<Completion<C>>,
}

impl<C> MainThreadQueue<C> {
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    pub fn handle(&self) -> QueueHandle<C> {
        QueueHandle {
            sender: self.sender.clone(),
        }
    }

    /// Runs every completion queued so far against `ctx`. Returns how many ran.
    pub fn drain(&self, ctx: &mut C) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.receiver.try_recv() {
            completion(ctx);
            processed += 1;
        }
        processed
    }

    /// Blocks up to `timeout` for one completion and runs it.
    pub fn process_next(&self, ctx: &mut C, timeout: Duration) -> bool {
        match self.receiver.recv_timeout(timeout) {
            Ok(completion) => {
                completion(ctx);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl<C> Default for MainThreadQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sending end handed to workers.
pub struct QueueHandle<C> {
    sender: Sender<Completion<C>>,
}

impl<C> Clone for QueueHandle<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<C> QueueHandle<C> {
    /// Returns false once the queue is gone.
    pub fn post(&self, completion: impl FnOnce(&mut C) + Send + 'static) -> bool {
        self.sender.send(Box::new(completion)).is_ok()
    }
}

/// Runs `work` on the rayon pool and posts `on_complete` with its result.
///
/// There is no cancellation. A job whose queue has been dropped still runs to
/// the end; its result is discarded.
pub fn spawn_job<C, T, W, F>(handle: &QueueHandle<C>, work: W, on_complete: F)
where
    C: 'static,
    T: Send + 'static,
    W: FnOnce() -> Result<T> + Send + 'static,
    F: FnOnce(&mut C, Result<T>) + Send + 'static,
{
    let handle = handle.clone();
    rayon::spawn(move || {
        let result = work();
        if !handle.post(move |ctx| on_complete(ctx, result)) {
            log::warn!("Completion queue closed, dropping job result");
        }
    });
}

/// Per-model guard: at most one generation and one rescale in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TerrainJobs {
    generation: JobStatus,
    rescale: JobStatus,
}

impl TerrainJobs {
    pub fn generation(&self) -> JobStatus {
        self.generation
    }

    pub fn rescale(&self) -> JobStatus {
        self.rescale
    }

    pub fn begin_generation(&mut self) -> Result<()> {
        begin(&mut self.generation, "mesh generation")
    }

    pub fn begin_rescale(&mut self) -> Result<()> {
        begin(&mut self.rescale, "height rescale")
    }

    pub fn finish_generation<T>(&mut self, result: &Result<T>) {
        finish(&mut self.generation, "mesh generation", result);
    }

    pub fn finish_rescale<T>(&mut self, result: &Result<T>) {
        finish(&mut self.rescale, "height rescale", result);
    }
}

fn begin(status: &mut JobStatus, name: &'static str) -> Result<()> {
    if status.is_in_progress() {
        return Err(TerrainError::JobInProgress(name));
    }
    *status = JobStatus::InProgress;
    log::info!("Started {name} job");
    Ok(())
}

fn finish<T>(status: &mut JobStatus, name: &str, result: &Result<T>) {
    *status = match result {
        Ok(_) => {
            log::info!("Finished {name} job");
            JobStatus::Completed
        }
        Err(err) => {
            log::warn!("{name} job failed: {err}");
            JobStatus::Failed
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::{self, ThreadId};

    const WAIT: Duration = Duration::from_secs(10);

    #[derive(Default)]
    struct Context {
        values: Vec<u32>,
        threads: Vec<ThreadId>,
    }

    #[test]
    fn drain_runs_in_post_order() {
        let queue = MainThreadQueue::<Context>::new();
        let handle = queue.handle();
        for i in 0..5 {
            assert!(handle.post(move |ctx: &mut Context| ctx.values.push(i)));
        }
        assert_eq!(queue.len(), 5);

        let mut ctx = Context::default();
        assert_eq!(queue.drain(&mut ctx), 5);
        assert_eq!(ctx.values, vec![0, 1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn completion_runs_on_draining_thread() {
        let queue = MainThreadQueue::<Context>::new();
        spawn_job(
            &queue.handle(),
            || Ok(thread::current().id()),
            |ctx: &mut Context, worker: Result<ThreadId>| {
                ctx.threads.push(worker.unwrap());
                ctx.threads.push(thread::current().id());
            },
        );

        let mut ctx = Context::default();
        assert!(queue.process_next(&mut ctx, WAIT));
        assert_eq!(ctx.threads.len(), 2);
        assert_ne!(ctx.threads[0], thread::current().id());
        assert_eq!(ctx.threads[1], thread::current().id());
    }

    #[test]
    fn failed_work_is_delivered() {
        let queue = MainThreadQueue::<Context>::new();
        spawn_job(
            &queue.handle(),
            || Err::<u32, _>(TerrainError::MissingSource),
            |ctx: &mut Context, result| {
                assert!(matches!(result, Err(TerrainError::MissingSource)));
                ctx.values.push(1);
            },
        );
        let mut ctx = Context::default();
        assert!(queue.process_next(&mut ctx, WAIT));
        assert_eq!(ctx.values, vec![1]);
    }

    #[test]
    fn post_fails_after_queue_dropped() {
        let queue = MainThreadQueue::<Context>::new();
        let handle = queue.handle();
        drop(queue);
        assert!(!handle.post(|_: &mut Context| {}));
    }

    #[test]
    fn one_job_of_each_kind() {
        let mut jobs = TerrainJobs::default();
        assert_eq!(jobs.generation(), JobStatus::NotStarted);

        jobs.begin_generation().unwrap();
        assert!(matches!(
            jobs.begin_generation(),
            Err(TerrainError::JobInProgress(_))
        ));
        // Independent slot
        jobs.begin_rescale().unwrap();

        jobs.finish_generation(&Ok(()));
        assert_eq!(jobs.generation(), JobStatus::Completed);
        jobs.finish_rescale::<()>(&Err(TerrainError::MissingSource));
        assert_eq!(jobs.rescale(), JobStatus::Failed);

        jobs.begin_generation().unwrap();
        jobs.begin_rescale().unwrap();
        assert_eq!(jobs.rescale(), JobStatus::InProgress);
    }
}
