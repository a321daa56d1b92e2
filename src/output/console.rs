use crate::error::{Error, Result};
use crate::model::Item;
use crate::pipeline::ItemProcessor;
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::sync::Arc;

pub struct ConsoleOutput {
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleOutput {
    pub fn new(multi: Option<Arc<MultiProgress>>) -> Self {
        Self { multi }
    }
}

impl Default for ConsoleOutput {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl ItemProcessor for ConsoleOutput {
    async fn process(&self, item: Item) -> Result<Item> {
        let output = serde_json::to_string_pretty(&item)?;

        if let Some(multi) = &self.multi {
            for line in output.lines() {
                multi
                    .println(line)
                    .map_err(|e| Error::Internal(e.to_string()))?;
            }
        } else {
            for line in output.lines() {
                println!("{}", line);
            }
        }
        Ok(item)
    }
}
