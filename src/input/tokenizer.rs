use std::io::{self, BufRead, BufReader, Read};

use super::Record;

/// Splits a byte stream into records on a single-byte delimiter.
///
/// The delimiter is stripped from each record. A trailing fragment with no
/// delimiter after it is still yielded, an empty stream yields nothing, and
/// empty tokens between two delimiters are yielded as empty records. After a
/// read error has been yielded the iterator is exhausted.
pub struct Tokenizer<R> {
    reader: BufReader<R>,
    delimiter: u8,
    finished: bool,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(reader: R, delimiter: u8) -> Self {
        Self {
            reader: BufReader::new(reader),
            delimiter,
            finished: false,
        }
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }
}

impl<R: Read> Iterator for Tokenizer<R> {
    type Item = io::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut buf = Vec::new();
        match self.reader.read_until(self.delimiter, &mut buf) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) => {
                if buf.last() == Some(&self.delimiter) {
                    buf.pop();
                }
                Some(Ok(Record::new(buf)))
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> std::iter::FusedIterator for Tokenizer<R> {}
