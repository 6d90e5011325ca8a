//! Thread-safe buffered output sink
//!
//! Every worker writes a record's output with a single
//! [`SyncWriter::write_all`] call, which holds the lock for the whole block,
//! so output from different records never interleaves mid-block. Blocks from
//! different workers land in whatever order the workers finish.

use std::io::{self, BufWriter, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct SyncWriter {
    inner: Mutex<BufWriter<Box<dyn Write + Send>>>,
}

impl SyncWriter {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Mutex::new(BufWriter::new(Box::new(writer))),
        }
    }

    /// Write the whole buffer as one uninterrupted block
    pub fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.lock().write_all(buf)
    }

    /// Push buffered bytes to the destination
    pub fn flush(&self) -> io::Result<()> {
        self.lock().flush()
    }

    fn lock(&self) -> MutexGuard<'_, BufWriter<Box<dyn Write + Send>>> {
        // A worker that panicked mid-write leaves at worst a partial block behind
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Write for &SyncWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        SyncWriter::write_all(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        SyncWriter::flush(self)
    }
}

impl std::fmt::Debug for SyncWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWriter").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    /// In-memory destination that stays readable after being handed off
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_output_is_buffered_until_flush() {
        let buffer = SharedBuffer::default();
        let writer = SyncWriter::new(buffer.clone());

        writer.write_all(b"hello").unwrap();
        assert_eq!(buffer.contents(), "");

        writer.flush().unwrap();
        assert_eq!(buffer.contents(), "hello");
    }

    #[test]
    fn test_concurrent_blocks_do_not_interleave() {
        let buffer = SharedBuffer::default();
        let writer = Arc::new(SyncWriter::new(buffer.clone()));

        let handles: Vec<_> = (0..8u8)
            .map(|id| {
                let writer = Arc::clone(&writer);
                std::thread::spawn(move || {
                    let block = vec![b'a' + id; 10_000];
                    for _ in 0..20 {
                        writer.write_all(&block).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        writer.flush().unwrap();

        let contents = buffer.contents();
        assert_eq!(contents.len(), 8 * 20 * 10_000);
        for chunk in contents.as_bytes().chunks(10_000) {
            assert!(chunk.iter().all(|b| *b == chunk[0]), "block was split");
        }
    }

    #[test]
    fn test_poisoned_lock_is_recovered() {
        let buffer = SharedBuffer::default();
        let writer = Arc::new(SyncWriter::new(buffer.clone()));

        writer.write_all(b"before ").unwrap();
        let poisoner = Arc::clone(&writer);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.inner.lock().unwrap();
            panic!("worker died holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(writer.inner.is_poisoned());

        writer.write_all(b"after").unwrap();
        writer.flush().unwrap();
        assert_eq!(buffer.contents(), "before after");
    }

    #[test]
    fn test_write_trait_on_shared_reference() {
        let buffer = SharedBuffer::default();
        let writer = SyncWriter::new(buffer.clone());

        let mut sink = &writer;
        writeln!(sink, "line {}", 1).unwrap();
        sink.flush().unwrap();
        assert_eq!(buffer.contents(), "line 1\n");
    }
}
