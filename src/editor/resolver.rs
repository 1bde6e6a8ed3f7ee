use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use crate::schema::{RowValues, SelectOption};

/// Supplies options for a select column, possibly asynchronously.
///
/// Implementations may answer inside `resolve` or keep the reply and answer
/// later from any thread. Answers that arrive after the request was
/// superseded are dropped by the grid.
pub trait OptionResolver: Send + Sync {
    fn resolve(&self, request: OptionRequest, reply: OptionReply);
}

#[derive(Debug, Clone)]
pub struct OptionRequest {
    pub row: usize,
    pub column: String,
    pub values: RowValues,
    pub query: String,
}

/// A resolver's answer, tagged with the job it belongs to
#[derive(Debug)]
pub struct OptionResponse {
    pub job: u64,
    pub result: Result<Vec<SelectOption>, String>,
}

/// One-shot reply handle that doubles as a cancellation token.
///
/// The grid bumps the shared generation whenever the request is superseded
/// (new search, editor closed, different cell), after which `is_cancelled`
/// reports true and anything sent is discarded on arrival.
#[derive(Debug)]
pub struct OptionReply {
    job: u64,
    generation: Arc<AtomicU64>,
    tx: Sender<OptionResponse>,
}

impl OptionReply {
    pub(crate) fn new(job: u64, generation: Arc<AtomicU64>, tx: Sender<OptionResponse>) -> Self {
        Self { job, generation, tx }
    }

    pub fn job(&self) -> u64 {
        self.job
    }

    pub fn is_cancelled(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.job
    }

    pub fn send(self, result: Result<Vec<SelectOption>, String>) {
        // the receiver is gone only when the grid itself was dropped
        let _ = self.tx.send(OptionResponse { job: self.job, result });
    }
}

/// Monotonic job counter shared with outstanding replies
#[derive(Debug, Clone, Default)]
pub struct JobCounter {
    current: Arc<AtomicU64>,
}

impl JobCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new job, superseding every earlier one
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, job: u64) -> bool {
        self.current() == job
    }

    pub(crate) fn reply(&self, job: u64, tx: Sender<OptionResponse>) -> OptionReply {
        OptionReply::new(job, self.current.clone(), tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_reply_cancelled_once_superseded() {
        let (tx, rx) = mpsc::channel();
        let jobs = JobCounter::new();
        let first = jobs.next();
        let reply = jobs.reply(first, tx);
        assert!(!reply.is_cancelled());

        jobs.next();
        assert!(reply.is_cancelled());
        reply.send(Ok(vec![]));

        let response = rx.try_recv().unwrap();
        assert_eq!(response.job, first);
        assert!(!jobs.is_current(response.job));
    }
}
