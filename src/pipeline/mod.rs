/*!
 * Chunk-oriented read / process / write engine
 *
 * A step pulls items from an [`ItemReader`], hands each to an
 * [`ItemProcessor`], and buffers accepted results into a [`Chunk`]. When the
 * chunk is full, or the reader is exhausted with a non-empty buffer, the
 * chunk is passed to the [`ItemWriter`] as one commit unit.
 *
 * Failure channels:
 *
 * - `Ok(Processed::Skip)` drops the item silently (filtered).
 * - `Ok(Processed::Reject(err))` drops the item and logs `err`; the step
 *   continues.
 * - `Err(_)` from any of the three stages fails the whole step. Nothing is
 *   retried and chunks written before the failure stay written.
 */

mod step;

pub use step::{ChunkStep, StepStats};

use crate::error::{FerryError, Result};

/// Default number of accepted items per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Ordered batch of accepted items, the unit of commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk<T> {
    items: Vec<T>,
}

impl<T> Chunk<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> From<Vec<T>> for Chunk<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> IntoIterator for Chunk<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Result of processing one item
#[derive(Debug)]
pub enum Processed<U> {
    /// Item goes into the current chunk
    Accept(U),

    /// Item is filtered out without error
    Skip,

    /// Item failed on its own; logged and treated as a skip
    Reject(FerryError),
}

/// Source of items; `Ok(None)` marks the end of input
pub trait ItemReader<T> {
    fn read(&mut self) -> Result<Option<T>>;
}

/// Per-item transformation
pub trait ItemProcessor<T, U> {
    fn process(&mut self, item: T) -> Result<Processed<U>>;
}

impl<T, U, F> ItemProcessor<T, U> for F
where
    F: FnMut(T) -> Result<Processed<U>>,
{
    fn process(&mut self, item: T) -> Result<Processed<U>> {
        self(item)
    }
}

/// Chunk consumer
pub trait ItemWriter<T> {
    /// Commit one chunk. An error fails the step.
    fn write(&mut self, chunk: Chunk<T>) -> Result<()>;

    /// Called once after the last chunk when the step succeeds
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Adapts any iterator into an infallible reader
pub struct IterReader<I> {
    inner: I,
}

impl<I> IterReader<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<T, I: Iterator<Item = T>> ItemReader<T> for IterReader<I> {
    fn read(&mut self) -> Result<Option<T>> {
        Ok(self.inner.next())
    }
}

/// Processor that accepts every item unchanged
pub fn pass_through<T>(item: T) -> Result<Processed<T>> {
    Ok(Processed::Accept(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_basics() {
        let mut chunk = Chunk::with_capacity(2);
        assert!(chunk.is_empty());
        chunk.push("a");
        chunk.push("b");
        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.iter().copied().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(chunk.into_inner(), vec!["a", "b"]);
    }

    #[test]
    fn test_iter_reader_signals_end() {
        let mut reader = IterReader::new(vec![1, 2].into_iter());
        assert_eq!(reader.read().unwrap(), Some(1));
        assert_eq!(reader.read().unwrap(), Some(2));
        assert_eq!(reader.read().unwrap(), None);
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn test_closure_processor() {
        let mut doubler = |n: i32| -> Result<Processed<i32>> { Ok(Processed::Accept(n * 2)) };
        match doubler.process(21).unwrap() {
            Processed::Accept(n) => assert_eq!(n, 42),
            other => panic!("unexpected {:?}", other),
        }
    }
}
