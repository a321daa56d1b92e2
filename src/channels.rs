//! The four inter-stage message buses, opened and closed as one unit.

use crate::error::{ChannelError, CrawlerError};
use crate::model::{DownloadRequest, DownloadResponse, Item};
use kanal::{AsyncReceiver, AsyncSender};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Capacities of the request, response, item and error channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    req_chan_len: usize,
    resp_chan_len: usize,
    item_chan_len: usize,
    error_chan_len: usize,
}

impl ChannelConfig {
    pub fn new(
        req_chan_len: usize,
        resp_chan_len: usize,
        item_chan_len: usize,
        error_chan_len: usize,
    ) -> Self {
        Self {
            req_chan_len,
            resp_chan_len,
            item_chan_len,
            error_chan_len,
        }
    }

    pub fn validate(&self) -> Result<(), ChannelError> {
        if self.req_chan_len == 0 {
            return Err(ChannelError::InvalidCapacity("request"));
        }
        if self.resp_chan_len == 0 {
            return Err(ChannelError::InvalidCapacity("response"));
        }
        if self.item_chan_len == 0 {
            return Err(ChannelError::InvalidCapacity("item"));
        }
        if self.error_chan_len == 0 {
            return Err(ChannelError::InvalidCapacity("error"));
        }
        Ok(())
    }

    pub fn req_chan_len(&self) -> usize {
        self.req_chan_len
    }

    pub fn resp_chan_len(&self) -> usize {
        self.resp_chan_len
    }

    pub fn item_chan_len(&self) -> usize {
        self.item_chan_len
    }

    pub fn error_chan_len(&self) -> usize {
        self.error_chan_len
    }
}

impl fmt::Display for ChannelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ reqChanLen: {}, respChanLen: {}, itemChanLen: {}, errorChanLen: {} }}",
            self.req_chan_len, self.resp_chan_len, self.item_chan_len, self.error_chan_len
        )
    }
}

/// Both ends of a bounded channel. Cloning shares the same queue.
pub struct Channel<T> {
    name: &'static str,
    tx: AsyncSender<T>,
    rx: AsyncReceiver<T>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Channel<T> {
    fn bounded(name: &'static str, capacity: usize) -> Self {
        let (tx, rx) = kanal::bounded_async(capacity);
        Self { name, tx, rx }
    }

    pub async fn send(&self, value: T) -> Result<(), ChannelError> {
        self.tx
            .send(value)
            .await
            .map_err(|_| ChannelError::Closed(self.name))
    }

    /// Waits for the next value. Fails once the channel is closed.
    pub async fn recv(&self) -> Result<T, ChannelError> {
        self.rx
            .recv()
            .await
            .map_err(|_| ChannelError::Closed(self.name))
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.rx.capacity()
    }

    pub fn free_capacity(&self) -> usize {
        self.capacity().saturating_sub(self.len())
    }

    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }

    fn close(&self) {
        let _ = self.tx.close();
    }

    fn usage(&self) -> ChannelUsage {
        ChannelUsage {
            len: self.len(),
            capacity: self.capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelManagerStatus {
    Uninitialized,
    Initialized,
    Closed,
}

impl fmt::Display for ChannelManagerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelManagerStatus::Uninitialized => "uninitialized",
            ChannelManagerStatus::Initialized => "initialized",
            ChannelManagerStatus::Closed => "closed",
        };
        f.write_str(name)
    }
}

struct Channels {
    req: Channel<DownloadRequest>,
    resp: Channel<DownloadResponse>,
    item: Channel<Item>,
    error: Channel<CrawlerError>,
}

struct Inner {
    status: ChannelManagerStatus,
    config: Option<ChannelConfig>,
    channels: Option<Channels>,
}

pub struct ChannelManager {
    inner: RwLock<Inner>,
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner {
                status: ChannelManagerStatus::Uninitialized,
                config: None,
                channels: None,
            }),
        }
    }
}

impl ChannelManager {
    /// Creates an initialized manager.
    pub fn new(config: ChannelConfig) -> Result<Self, ChannelError> {
        let manager = Self::default();
        manager.init(config, true)?;
        Ok(manager)
    }

    /// Allocates fresh channels. Without `reset`, an initialized manager is
    /// left untouched and an error is returned.
    pub fn init(&self, config: ChannelConfig, reset: bool) -> Result<(), ChannelError> {
        config.validate()?;

        let mut inner = self.inner.write();
        if !reset && inner.status == ChannelManagerStatus::Initialized {
            return Err(ChannelError::AlreadyInitialized);
        }
        inner.channels = Some(Channels {
            req: Channel::bounded("request", config.req_chan_len()),
            resp: Channel::bounded("response", config.resp_chan_len()),
            item: Channel::bounded("item", config.item_chan_len()),
            error: Channel::bounded("error", config.error_chan_len()),
        });
        inner.config = Some(config);
        inner.status = ChannelManagerStatus::Initialized;
        Ok(())
    }

    /// Closes all four channels. Closing twice is a no-op.
    pub fn close(&self) -> Result<(), ChannelError> {
        let mut inner = self.inner.write();
        match inner.status {
            ChannelManagerStatus::Uninitialized => Err(ChannelError::CloseUninitialized),
            ChannelManagerStatus::Closed => {
                log::info!("The channel manager has been closed.");
                Ok(())
            }
            ChannelManagerStatus::Initialized => {
                if let Some(channels) = &inner.channels {
                    channels.req.close();
                    channels.resp.close();
                    channels.item.close();
                    channels.error.close();
                }
                inner.status = ChannelManagerStatus::Closed;
                Ok(())
            }
        }
    }

    pub fn req_chan(&self) -> Result<Channel<DownloadRequest>, ChannelError> {
        self.with_channels(|c| c.req.clone())
    }

    pub fn resp_chan(&self) -> Result<Channel<DownloadResponse>, ChannelError> {
        self.with_channels(|c| c.resp.clone())
    }

    pub fn item_chan(&self) -> Result<Channel<Item>, ChannelError> {
        self.with_channels(|c| c.item.clone())
    }

    pub fn error_chan(&self) -> Result<Channel<CrawlerError>, ChannelError> {
        self.with_channels(|c| c.error.clone())
    }

    pub fn status(&self) -> ChannelManagerStatus {
        self.inner.read().status
    }

    pub fn config(&self) -> Option<ChannelConfig> {
        self.inner.read().config
    }

    pub fn summary(&self) -> ChannelManagerSummary {
        let inner = self.inner.read();
        let usage = |f: fn(&Channels) -> ChannelUsage| {
            inner.channels.as_ref().map(f).unwrap_or_default()
        };
        ChannelManagerSummary {
            status: inner.status,
            request: usage(|c| c.req.usage()),
            response: usage(|c| c.resp.usage()),
            item: usage(|c| c.item.usage()),
            error: usage(|c| c.error.usage()),
        }
    }

    fn with_channels<R>(&self, f: impl FnOnce(&Channels) -> R) -> Result<R, ChannelError> {
        let inner = self.inner.read();
        match (&inner.status, &inner.channels) {
            (ChannelManagerStatus::Initialized, Some(channels)) => Ok(f(channels)),
            (status, _) => Err(ChannelError::UndesirableStatus(status.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelUsage {
    pub len: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelManagerSummary {
    pub status: ChannelManagerStatus,
    pub request: ChannelUsage,
    pub response: ChannelUsage,
    pub item: ChannelUsage,
    pub error: ChannelUsage,
}

impl fmt::Display for ChannelManagerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "status: {}, requestChannel: {}/{}, responseChannel: {}/{}, itemChannel: {}/{}, errorChannel: {}/{}",
            self.status,
            self.request.len,
            self.request.capacity,
            self.response.len,
            self.response.capacity,
            self.item.len,
            self.item.capacity,
            self.error.len,
            self.error.capacity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn config() -> ChannelConfig {
        ChannelConfig::new(4, 3, 2, 1)
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert_eq!(
            ChannelConfig::new(0, 1, 1, 1).validate(),
            Err(ChannelError::InvalidCapacity("request"))
        );
        assert_eq!(
            ChannelConfig::new(1, 1, 1, 0).validate(),
            Err(ChannelError::InvalidCapacity("error"))
        );
        assert!(ChannelManager::new(ChannelConfig::new(1, 0, 1, 1)).is_err());
    }

    #[test]
    fn test_accessors_fail_before_init() {
        let manager = ChannelManager::default();
        assert!(manager.req_chan().is_err());
        assert!(manager.resp_chan().is_err());
        assert!(manager.item_chan().is_err());
        assert!(manager.error_chan().is_err());
        assert_eq!(manager.close(), Err(ChannelError::CloseUninitialized));
    }

    #[test]
    fn test_init_allocates_configured_capacities() {
        let manager = ChannelManager::new(config()).unwrap();
        assert_eq!(manager.status(), ChannelManagerStatus::Initialized);
        assert_eq!(manager.req_chan().unwrap().capacity(), 4);
        assert_eq!(manager.resp_chan().unwrap().capacity(), 3);
        assert_eq!(manager.item_chan().unwrap().capacity(), 2);
        assert_eq!(manager.error_chan().unwrap().capacity(), 1);
    }

    #[test]
    fn test_init_without_reset_rejects_reinit() {
        let manager = ChannelManager::new(config()).unwrap();
        assert_eq!(
            manager.init(config(), false),
            Err(ChannelError::AlreadyInitialized)
        );
        assert!(manager.init(ChannelConfig::new(8, 8, 8, 8), true).is_ok());
        assert_eq!(manager.req_chan().unwrap().capacity(), 8);
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_closes_channels() {
        let manager = ChannelManager::new(config()).unwrap();
        let errors = manager.error_chan().unwrap();
        errors
            .send(CrawlerError::new(ErrorKind::Parser, "bad"))
            .await
            .unwrap();

        manager.close().unwrap();
        manager.close().unwrap();
        assert_eq!(manager.status(), ChannelManagerStatus::Closed);
        assert!(manager.req_chan().is_err());
        assert!(errors.is_closed());
        assert!(errors
            .send(CrawlerError::new(ErrorKind::Parser, "late"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_summary_reports_lengths() {
        let manager = ChannelManager::new(config()).unwrap();
        let mut item = Item::new();
        item.insert("title".into(), "x".into());
        manager.item_chan().unwrap().send(item).await.unwrap();

        let summary = manager.summary();
        assert_eq!(summary.item, ChannelUsage { len: 1, capacity: 2 });
        assert_eq!(
            summary.to_string(),
            "status: initialized, requestChannel: 0/4, responseChannel: 0/3, itemChannel: 1/2, errorChannel: 0/1"
        );
    }
}
