use crate::error::{Error, Result};
use crate::model::Item;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// One stage of the item pipeline. Returns the (possibly transformed) item
/// handed to the next stage.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    async fn process(&self, item: Item) -> Result<Item>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Adapts a plain function into an [`ItemProcessor`].
pub struct FnProcessor<F> {
    f: F,
}

impl<F> FnProcessor<F>
where
    F: Fn(Item) -> Result<Item> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ItemProcessor for FnProcessor<F>
where
    F: Fn(Item) -> Result<Item> + Send + Sync,
{
    async fn process(&self, item: Item) -> Result<Item> {
        (self.f)(item)
    }
}

pub struct ItemPipeline {
    processors: Vec<Arc<dyn ItemProcessor>>,
    fail_fast: AtomicBool,
    sent: AtomicU64,
    accepted: AtomicU64,
    processed: AtomicU64,
    processing: AtomicU64,
}

impl ItemPipeline {
    pub fn new(processors: Vec<Arc<dyn ItemProcessor>>) -> Result<Self> {
        if processors.is_empty() {
            return Err(Error::Config("Invalid item processor list".to_string()));
        }
        Ok(Self {
            processors,
            fail_fast: AtomicBool::new(false),
            sent: AtomicU64::new(0),
            accepted: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            processing: AtomicU64::new(0),
        })
    }

    /// Runs `item` through every processor in order. A failing processor
    /// leaves the item unchanged for the next one, unless fail-fast is on.
    pub async fn send(&self, item: Item) -> Vec<Error> {
        self.sent.fetch_add(1, Ordering::SeqCst);
        self.processing.fetch_add(1, Ordering::SeqCst);
        self.accepted.fetch_add(1, Ordering::SeqCst);

        let mut errors = Vec::new();
        let mut current = item;
        for processor in &self.processors {
            match processor.process(current.clone()).await {
                Ok(next) => current = next,
                Err(e) => {
                    errors.push(e);
                    if self.fail_fast() {
                        break;
                    }
                }
            }
        }

        self.processed.fetch_add(1, Ordering::SeqCst);
        self.processing.fetch_sub(1, Ordering::SeqCst);
        errors
    }

    /// Closes every processor, collecting failures.
    pub async fn close(&self) -> Vec<Error> {
        let mut errors = Vec::new();
        for processor in &self.processors {
            if let Err(e) = processor.close().await {
                errors.push(e);
            }
        }
        errors
    }

    pub fn fail_fast(&self) -> bool {
        self.fail_fast.load(Ordering::SeqCst)
    }

    pub fn set_fail_fast(&self, fail_fast: bool) {
        self.fail_fast.store(fail_fast, Ordering::SeqCst);
    }

    pub fn sent_num(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn accepted_num(&self) -> u64 {
        self.accepted.load(Ordering::SeqCst)
    }

    pub fn processed_num(&self) -> u64 {
        self.processed.load(Ordering::SeqCst)
    }

    pub fn processing_num(&self) -> u64 {
        self.processing.load(Ordering::SeqCst)
    }

    pub fn summary(&self) -> PipelineSummary {
        PipelineSummary {
            fail_fast: self.fail_fast(),
            processors: self.processors.len(),
            sent: self.sent_num(),
            accepted: self.accepted_num(),
            processed: self.processed_num(),
            processing: self.processing_num(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub fail_fast: bool,
    pub processors: usize,
    pub sent: u64,
    pub accepted: u64,
    pub processed: u64,
    pub processing: u64,
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failFast: {}, processorNumber: {}, sent: {}, accepted: {}, processed: {}, processingNumber: {}",
            self.fail_fast,
            self.processors,
            self.sent,
            self.accepted,
            self.processed,
            self.processing
        )
    }
}
