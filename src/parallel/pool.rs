use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Local};
use crossbeam::select;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::cancel::CancelSignal;
use super::queue::{Producer, RecordQueue};
use crate::command::{CommandSpec, exec};
use crate::input::{NEWLINE, Record};
use crate::shared::SyncWriter;

/// Pool sizing and input framing
#[derive(Debug, Clone)]
pub struct PoolOptions {
    /// Number of workers, at least 1
    pub concurrency: usize,
    /// Record delimiter
    pub delimiter: u8,
    /// Maximum records buffered between the reader and the workers
    pub queue_capacity: usize,
}

impl PoolOptions {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            delimiter: NEWLINE,
            queue_capacity: concurrency,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self::new(default_concurrency())
    }
}

/// One worker per logical core
pub fn default_concurrency() -> usize {
    num_cpus::get().max(1)
}

/// What happened during [`WorkerPool::run`]
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Records taken off the queue and handed to the command builder
    pub dispatched: usize,
    /// Records whose command failed to render, spawn or exit successfully
    pub failed: usize,
    /// Whether the run stopped early because of cancellation
    pub cancelled: bool,
    /// Error that cut the input stream short, if any
    pub read_error: Option<io::Error>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.read_error.is_none() && !self.cancelled
    }
}

#[derive(Default)]
struct Counters {
    dispatched: AtomicUsize,
    failed: AtomicUsize,
}

enum Dequeued {
    Record(Record),
    Closed,
    Cancelled,
}

#[derive(Debug)]
enum WorkerExit {
    QueueClosed,
    Cancelled,
}

/// Fixed-size pool of workers running one command per record
pub struct WorkerPool {
    command: CommandSpec,
    concurrency: usize,
    queue: RecordQueue,
    producer: Producer,
    cancel: CancelSignal,
    out: Arc<SyncWriter>,
    err: Arc<SyncWriter>,
    start: DateTime<Local>,
}

impl WorkerPool {
    /// Validate the options and start reading `input` in the background
    pub fn new<R>(
        options: PoolOptions,
        command: CommandSpec,
        input: R,
        out: Arc<SyncWriter>,
        err: Arc<SyncWriter>,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
    {
        if options.concurrency == 0 {
            bail!("Concurrency must be at least 1");
        }

        let (queue, producer) =
            RecordQueue::spawn(input, options.delimiter, options.queue_capacity)?;

        Ok(Self {
            command,
            concurrency: options.concurrency,
            queue,
            producer,
            cancel: CancelSignal::new(),
            out,
            err,
            start: Local::now(),
        })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Signal that stops this pool when cancelled
    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Run all workers to completion, then flush both outputs
    pub fn run(self) -> Result<RunSummary> {
        let counters = Counters::default();
        tracing::debug!(
            workers = self.concurrency,
            queue_capacity = self.queue.capacity(),
            "Starting worker pool"
        );

        crossbeam::thread::scope(|s| {
            for worker_id in 0..self.concurrency {
                let pool = &self;
                let counters = &counters;
                s.spawn(move |_| pool.worker(worker_id, counters));
            }
        })
        .map_err(|_| anyhow!("Thread panic occurred during parallel execution"))?;

        self.out.flush().context("Failed to flush standard output")?;
        self.err.flush().context("Failed to flush standard error")?;

        let cancelled = self.cancel.is_cancelled();
        // A cancelled run may leave the reader blocked on its input; leave it behind
        let read_error = if cancelled && !self.producer.is_finished() {
            None
        } else {
            self.producer.join().err()
        };

        let summary = RunSummary {
            dispatched: counters.dispatched.into_inner(),
            failed: counters.failed.into_inner(),
            cancelled,
            read_error,
        };
        tracing::debug!(
            dispatched = summary.dispatched,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "Worker pool finished"
        );
        Ok(summary)
    }

    fn worker(&self, worker_id: usize, counters: &Counters) {
        let exit = loop {
            if self.cancel.is_cancelled() {
                break WorkerExit::Cancelled;
            }

            let dequeued = select! {
                recv(self.queue.receiver()) -> msg => msg.map_or(Dequeued::Closed, Dequeued::Record),
                recv(self.cancel.notified()) -> _ => Dequeued::Cancelled,
            };

            match dequeued {
                Dequeued::Record(_) if self.cancel.is_cancelled() => break WorkerExit::Cancelled,
                Dequeued::Record(record) => {
                    counters.dispatched.fetch_add(1, Ordering::Relaxed);
                    if !self.process(worker_id, &record) {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Dequeued::Closed => break WorkerExit::QueueClosed,
                Dequeued::Cancelled => break WorkerExit::Cancelled,
            }
        };
        tracing::trace!(worker = worker_id, reason = ?exit, "Worker exited");
    }

    /// Build, run and report one record. Returns `false` if anything failed.
    fn process(&self, worker_id: usize, record: &Record) -> bool {
        let invocation = match self.command.build(record, self.start) {
            Ok(invocation) => invocation,
            Err(e) => {
                tracing::debug!(worker = worker_id, "Skipping record: {e:#}");
                self.report(format_args!("{e:#}"));
                return false;
            }
        };

        tracing::debug!(worker = worker_id, command = %invocation, "Running command");
        match exec::run(&invocation) {
            Ok(output) => {
                emit(&self.out, &output.stdout);
                emit(&self.err, &output.stderr);
                if output.status.success() {
                    true
                } else {
                    self.report(format_args!(
                        "Failed to run command `{invocation}`: {}",
                        output.status
                    ));
                    false
                }
            }
            Err(e) => {
                self.report(format_args!("Failed to run command `{invocation}`: {e}"));
                false
            }
        }
    }

    fn report(&self, message: fmt::Arguments<'_>) {
        emit(&self.err, format!("{message}\n").as_bytes());
    }
}

fn emit(sink: &SyncWriter, bytes: &[u8]) {
    if bytes.is_empty() {
        return;
    }
    if let Err(e) = sink.write_all(bytes) {
        tracing::warn!("Failed to write command output: {e}");
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("command", &self.command)
            .field("concurrency", &self.concurrency)
            .field("cancel", &self.cancel)
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}
