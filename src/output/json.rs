use crate::error::Result;
use crate::model::Item;
use crate::pipeline::ItemProcessor;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::Mutex;

struct JsonFile {
    file: File,
    first: bool,
}

/// Writes items as one JSON array; the closing bracket is written on close.
pub struct JsonOutput {
    state: Mutex<JsonFile>,
}

impl JsonOutput {
    pub fn new(path: PathBuf) -> Result<Self> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        write!(file, "[")?;

        Ok(Self {
            state: Mutex::new(JsonFile { file, first: true }),
        })
    }
}

#[async_trait]
impl ItemProcessor for JsonOutput {
    async fn process(&self, item: Item) -> Result<Item> {
        let mut state = self.state.lock().await;
        if !state.first {
            write!(state.file, ",")?;
        } else {
            state.first = false;
        }

        serde_json::to_writer(&mut state.file, &item)?;
        Ok(item)
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        write!(state.file, "]")?;
        state.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn test_items_form_a_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        let output = JsonOutput::new(path.clone()).unwrap();

        for title in ["one", "two"] {
            let mut item = Item::new();
            item.insert("title".into(), json!(title));
            output.process(item).await.unwrap();
        }
        output.close().await.unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written, json!([{"title": "one"}, {"title": "two"}]));
    }
}
