use crate::error::Result;
use crate::model::Item;
use crate::pipeline::ItemProcessor;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use tokio::sync::Mutex;

struct CsvFile {
    writer: ::csv::Writer<std::fs::File>,
    headers: Option<Vec<String>>,
}

/// Writes one row per item. The first item's keys become the header; later
/// items are written in that column order, missing fields left empty.
pub struct CsvOutput {
    state: Mutex<CsvFile>,
}

impl CsvOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let writer = ::csv::Writer::from_path(path)?;
        Ok(Self {
            state: Mutex::new(CsvFile {
                writer,
                headers: None,
            }),
        })
    }
}

fn cell(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl ItemProcessor for CsvOutput {
    async fn process(&self, item: Item) -> Result<Item> {
        let mut state = self.state.lock().await;
        let state = &mut *state;

        let headers = match &state.headers {
            Some(headers) => headers.clone(),
            None => {
                let headers: Vec<String> = item.keys().cloned().collect();
                state.writer.write_record(&headers)?;
                state.headers = Some(headers.clone());
                headers
            }
        };

        let values: Vec<String> = headers.iter().map(|h| cell(item.get(h))).collect();
        state.writer.write_record(values)?;
        Ok(item)
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().await.writer.flush()?;
        Ok(())
    }
}
