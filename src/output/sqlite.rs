use crate::error::Result;
use crate::model::Item;
use crate::pipeline::ItemProcessor;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Stores every item as a row; columns come from the first item's keys.
pub struct SqliteOutput {
    pool: SqlitePool,
    table_name: String,
    columns: Mutex<Option<Vec<String>>>,
}

impl SqliteOutput {
    pub async fn new(path: PathBuf, table_name: String) -> Result<Self> {
        let conn_str = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&conn_str).await?;

        Ok(Self {
            pool,
            table_name,
            columns: Mutex::new(None),
        })
    }

    async fn ensure_table(&self, item: &Item) -> Result<Vec<String>> {
        let mut columns = self.columns.lock().await;
        if let Some(columns) = columns.as_ref() {
            return Ok(columns.clone());
        }

        let names: Vec<String> = item.keys().cloned().collect();
        let definitions: Vec<String> = names.iter().map(|k| format!("\"{}\" TEXT", k)).collect();
        let query = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (id INTEGER PRIMARY KEY, {})",
            self.table_name,
            definitions.join(", ")
        );
        sqlx::query(&query).execute(&self.pool).await?;

        *columns = Some(names.clone());
        Ok(names)
    }
}

#[async_trait]
impl ItemProcessor for SqliteOutput {
    async fn process(&self, item: Item) -> Result<Item> {
        let columns = self.ensure_table(&item).await?;
        let present: Vec<&String> = columns.iter().filter(|c| item.contains_key(*c)).collect();
        if present.is_empty() {
            return Ok(item);
        }

        let placeholders: Vec<String> = (1..=present.len()).map(|i| format!("?{}", i)).collect();
        let query = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            self.table_name,
            present
                .iter()
                .map(|c| format!("\"{}\"", c))
                .collect::<Vec<_>>()
                .join(", "),
            placeholders.join(", ")
        );

        let mut q = sqlx::query(&query);
        for column in &present {
            let val = match item.get(column.as_str()) {
                Some(Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
                None => String::new(),
            };
            q = q.bind(val);
        }
        q.execute(&self.pool).await?;
        Ok(item)
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_rows_follow_first_item_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.db");
        let output = SqliteOutput::new(path.clone(), "pages".into()).await.unwrap();

        let mut first = Item::new();
        first.insert("title".into(), json!("Home"));
        first.insert("depth".into(), json!(0));
        let returned = output.process(first.clone()).await.unwrap();
        assert_eq!(returned, first);

        let mut second = Item::new();
        second.insert("title".into(), json!("About"));
        output.process(second).await.unwrap();
        output.close().await.unwrap();

        let pool = SqlitePool::connect(&format!("sqlite:{}", path.display()))
            .await
            .unwrap();
        let rows: Vec<(String, Option<String>)> =
            sqlx::query_as("SELECT \"title\", \"depth\" FROM \"pages\" ORDER BY id")
                .fetch_all(&pool)
                .await
                .unwrap();
        pool.close().await;

        assert_eq!(
            rows,
            vec![
                ("Home".to_string(), Some("0".to_string())),
                ("About".to_string(), None),
            ]
        );
    }
}
