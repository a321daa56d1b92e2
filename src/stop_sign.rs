//! One-shot cooperative cancellation with per-participant acknowledgements.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tokio::sync::watch;

pub struct StopSign {
    signed: watch::Sender<bool>,
    records: RwLock<BTreeMap<String, u32>>,
}

impl Default for StopSign {
    fn default() -> Self {
        let (signed, _) = watch::channel(false);
        Self {
            signed,
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl StopSign {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the sign. Returns `false` if it was already raised.
    pub fn sign_stop(&self) -> bool {
        let _records = self.records.write();
        self.signed.send_if_modified(|signed| {
            if *signed {
                false
            } else {
                *signed = true;
                true
            }
        })
    }

    pub fn is_signed(&self) -> bool {
        *self.signed.borrow()
    }

    /// Resolves once the sign is raised.
    pub async fn wait(&self) {
        let mut rx = self.signed.subscribe();
        let _ = rx.wait_for(|signed| *signed).await;
    }

    /// Lowers the sign and forgets every record.
    pub fn reset(&self) {
        let mut records = self.records.write();
        self.signed.send_replace(false);
        records.clear();
    }

    /// Counts an acknowledgement from `code`. Ignored until the sign is raised.
    pub fn record(&self, code: &str) {
        if !self.is_signed() {
            return;
        }
        *self.records.write().entry(code.to_string()).or_insert(0) += 1;
    }

    pub fn record_count(&self, code: &str) -> u32 {
        self.records.read().get(code).copied().unwrap_or(0)
    }

    pub fn record_total(&self) -> u32 {
        self.records.read().values().sum()
    }

    pub fn summary(&self) -> StopSignSummary {
        let records = self.records.read();
        StopSignSummary {
            signed: self.is_signed(),
            records: records.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopSignSummary {
    pub signed: bool,
    pub records: BTreeMap<String, u32>,
}

impl fmt::Display for StopSignSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.signed {
            write!(f, "signed: true, records: {:?}", self.records)
        } else {
            f.write_str("signed: false")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_sign_stop_only_once() {
        let sign = StopSign::new();
        assert!(!sign.is_signed());
        assert!(sign.sign_stop());
        assert!(sign.is_signed());
        for _ in 0..3 {
            assert!(!sign.sign_stop());
        }
    }

    #[test]
    fn test_record_ignored_before_sign() {
        let sign = StopSign::new();
        sign.record("downloader-1");
        assert_eq!(sign.record_total(), 0);
    }

    #[test]
    fn test_record_tally() {
        let sign = StopSign::new();
        sign.sign_stop();
        let codes = ["scheduler", "downloader-0", "parser-3", "item_pipeline"];
        for code in codes {
            sign.record(code);
        }
        sign.record("parser-3");

        assert_eq!(sign.record_total(), codes.len() as u32 + 1);
        assert_eq!(sign.record_count("parser-3"), 2);
        assert_eq!(sign.record_count("missing"), 0);
    }

    #[test]
    fn test_reset_lowers_sign() {
        let sign = StopSign::new();
        sign.sign_stop();
        sign.record("scheduler");
        sign.reset();

        assert!(!sign.is_signed());
        assert_eq!(sign.record_total(), 0);
        assert!(sign.sign_stop());
    }

    #[test]
    fn test_summary() {
        let sign = StopSign::new();
        assert_eq!(sign.summary().to_string(), "signed: false");
        sign.sign_stop();
        sign.record("scheduler");
        assert_eq!(
            sign.summary().to_string(),
            "signed: true, records: {\"scheduler\": 1}"
        );
    }

    #[tokio::test]
    async fn test_wait_resolves_on_sign() {
        let sign = Arc::new(StopSign::new());
        let waiter = {
            let sign = sign.clone();
            tokio::spawn(async move { sign.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        sign.sign_stop();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait should resolve after sign_stop")
            .unwrap();
    }
}
