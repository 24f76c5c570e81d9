//! Chunk step driver

use serde::Serialize;
use std::marker::PhantomData;
use tracing::{debug, info, warn};

use super::{Chunk, ItemProcessor, ItemReader, ItemWriter, Processed};
use crate::error::{FerryError, Result};

/// Counters for one step run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StepStats {
    /// Items returned by the reader
    pub read_count: u64,

    /// Items the processor accepted
    pub accepted_count: u64,

    /// Items the processor filtered out
    pub filtered_count: u64,

    /// Items the processor rejected with an error
    pub rejected_count: u64,

    /// Writer calls that succeeded
    pub chunks_written: u64,

    /// Items handed to the writer in successful chunks
    pub items_written: u64,
}

impl StepStats {
    /// Filtered plus rejected
    pub fn skipped_count(&self) -> u64 {
        self.filtered_count + self.rejected_count
    }
}

/// One bounded read / process / write run
pub struct ChunkStep<T, U, R, P, W> {
    name: String,
    reader: R,
    processor: P,
    writer: W,
    chunk_size: usize,
    stats: StepStats,
    _items: PhantomData<fn(T) -> U>,
}

impl<T, U, R, P, W> ChunkStep<T, U, R, P, W>
where
    R: ItemReader<T>,
    P: ItemProcessor<T, U>,
    W: ItemWriter<U>,
{
    /// Build a step. A chunk size of zero is a configuration error.
    pub fn new(
        name: impl Into<String>,
        reader: R,
        processor: P,
        writer: W,
        chunk_size: usize,
    ) -> Result<Self> {
        let name = name.into();
        if chunk_size == 0 {
            return Err(FerryError::Config(format!(
                "Step '{}': chunk size must be greater than 0",
                name
            )));
        }
        Ok(Self {
            name,
            reader,
            processor,
            writer,
            chunk_size,
            stats: StepStats::default(),
            _items: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Drive the step to completion
    ///
    /// On error the counters gathered so far are lost with the step; callers
    /// that need them on failure use [`ChunkStep::run_with_stats`].
    pub fn run(self) -> Result<StepStats> {
        let (stats, result) = self.run_with_stats();
        result.map(|_| stats)
    }

    /// Drive the step and return the counters together with the outcome
    pub fn run_with_stats(mut self) -> (StepStats, Result<()>) {
        let result = self.drive();
        match &result {
            Ok(()) => info!(
                step = %self.name,
                read = self.stats.read_count,
                written = self.stats.items_written,
                chunks = self.stats.chunks_written,
                skipped = self.stats.skipped_count(),
                "Step completed"
            ),
            Err(e) => warn!(step = %self.name, error = %e, "Step failed"),
        }
        (self.stats, result)
    }

    fn drive(&mut self) -> Result<()> {
        let mut chunk = Chunk::with_capacity(self.chunk_size);

        while let Some(item) = self.reader.read()? {
            self.stats.read_count += 1;

            match self.processor.process(item)? {
                Processed::Accept(out) => {
                    self.stats.accepted_count += 1;
                    chunk.push(out);
                }
                Processed::Skip => {
                    self.stats.filtered_count += 1;
                }
                Processed::Reject(err) => {
                    self.stats.rejected_count += 1;
                    warn!(
                        step = %self.name,
                        category = %err.category(),
                        "Skipping item: {}",
                        err
                    );
                }
            }

            if chunk.len() >= self.chunk_size {
                let full = std::mem::replace(&mut chunk, Chunk::with_capacity(self.chunk_size));
                self.commit(full)?;
            }
        }

        if !chunk.is_empty() {
            self.commit(chunk)?;
        }

        self.writer.finish()
    }

    fn commit(&mut self, chunk: Chunk<U>) -> Result<()> {
        let size = chunk.len() as u64;
        self.writer.write(chunk)?;
        self.stats.chunks_written += 1;
        self.stats.items_written += size;
        debug!(step = %self.name, items = size, "Chunk committed");
        Ok(())
    }
}
