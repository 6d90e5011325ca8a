//! Bounded record queue
//!
//! A single producer thread tokenizes the input and feeds a bounded
//! crossbeam channel; workers pull from the shared receiver. The bound
//! applies backpressure, so memory stays flat however large the input is.
//! The producer closes the queue by dropping its sender, which workers
//! observe as a disconnected channel.

use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, Sender, bounded};
use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use crate::input::{Record, Tokenizer};

/// Consumer side of the queue, shared by all workers
#[derive(Debug, Clone)]
pub struct RecordQueue {
    rx: Receiver<Record>,
}

/// Handle to the background producer
#[derive(Debug)]
pub struct Producer {
    handle: JoinHandle<io::Result<usize>>,
}

impl RecordQueue {
    /// Start producing records from `input` into a queue holding at most `capacity`
    pub fn spawn<R>(input: R, delimiter: u8, capacity: usize) -> Result<(Self, Producer)>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = bounded(capacity.max(1));
        let handle = thread::Builder::new()
            .name("parex-reader".to_string())
            .spawn(move || produce(Tokenizer::new(input, delimiter), tx))
            .context("Failed to start input reader thread")?;

        Ok((Self { rx }, Producer { handle }))
    }

    pub fn receiver(&self) -> &Receiver<Record> {
        &self.rx
    }

    pub fn capacity(&self) -> usize {
        self.rx.capacity().unwrap_or(0)
    }
}

impl Producer {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the producer. Returns the number of records queued, or the read error.
    pub fn join(self) -> io::Result<usize> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(io::Error::other("input reader thread panicked")))
    }
}

fn produce<R: Read>(records: Tokenizer<R>, tx: Sender<Record>) -> io::Result<usize> {
    let mut produced = 0;
    for record in records {
        let record = record.inspect_err(|e| tracing::error!("Failed to read input: {e}"))?;
        if tx.send(record).is_err() {
            tracing::debug!("All workers are gone, stopping input reader");
            break;
        }
        produced += 1;
    }
    tracing::debug!(produced, "Input exhausted, closing queue");
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_records_arrive_in_order_then_close() {
        let (queue, producer) = RecordQueue::spawn("a\nb\nc".as_bytes(), b'\n', 1).unwrap();

        let got: Vec<String> = queue
            .receiver()
            .iter()
            .map(|r| r.to_text().into_owned())
            .collect();
        assert_eq!(got, vec!["a", "b", "c"]);
        assert_eq!(producer.join().unwrap(), 3);
    }

    #[test]
    fn test_producer_blocks_when_full() {
        let input = "1\n2\n3\n4\n5\n".as_bytes();
        let (queue, producer) = RecordQueue::spawn(input, b'\n', 2).unwrap();
        assert_eq!(queue.capacity(), 2);

        std::thread::sleep(Duration::from_millis(50));
        assert!(!producer.is_finished());
        assert_eq!(queue.receiver().len(), 2);

        assert_eq!(queue.receiver().iter().count(), 5);
        assert_eq!(producer.join().unwrap(), 5);
    }

    #[test]
    fn test_producer_stops_when_queue_dropped() {
        let input = "1\n2\n3\n4\n5\n".as_bytes();
        let (queue, producer) = RecordQueue::spawn(input, b'\n', 1).unwrap();
        drop(queue);
        assert!(producer.join().unwrap() <= 1);
    }

    #[test]
    fn test_each_record_goes_to_one_consumer() {
        let input: String = (0..1000).map(|i| format!("{i}\n")).collect();
        let (queue, producer) = RecordQueue::spawn(std::io::Cursor::new(input), b'\n', 4).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let queue = queue.clone();
                std::thread::spawn(move || queue.receiver().iter().collect::<Vec<_>>())
            })
            .collect();
        drop(queue);

        let mut seen: Vec<usize> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .map(|r| r.to_text().parse().unwrap())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..1000).collect::<Vec<_>>());
        assert_eq!(producer.join().unwrap(), 1000);
    }
}
