use crate::channels::ChannelConfig;
use crate::pool::PoolBaseConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CrawlConfig {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(default)]
    #[validate(url)]
    pub seed_url: String,

    #[serde(default = "default_max_depth")]
    #[validate(range(min = 1))]
    pub max_depth: u32,

    #[serde(default)]
    #[validate]
    pub channels: ChannelSettings,

    #[serde(default)]
    #[validate]
    pub pools: PoolSettings,

    /// Hosts allowed in addition to the seed's domain.
    #[serde(default)]
    pub permit_domains: Vec<String>,

    #[serde(default = "default_feed_interval")]
    #[validate(range(min = 1))]
    pub feed_interval_ms: u64,

    #[serde(default = "default_monitor_interval")]
    #[validate(range(min = 1))]
    pub monitor_interval_ms: u64,

    #[serde(default = "default_summary_interval")]
    #[validate(range(min = 1))]
    pub summary_interval_ms: u64,

    #[serde(default = "default_idle_confirmations")]
    #[validate(range(min = 1))]
    pub idle_confirmations: u32,

    #[serde(default = "default_true")]
    pub fail_fast: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub output: Option<OutputConfig>,

    /// Optional path to a parent configuration file to inherit from
    #[serde(default)]
    pub extends: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ChannelSettings {
    #[validate(range(min = 1))]
    pub request: usize,
    #[validate(range(min = 1))]
    pub response: usize,
    #[validate(range(min = 1))]
    pub item: usize,
    #[validate(range(min = 1))]
    pub error: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            request: 20,
            response: 20,
            item: 10,
            error: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct PoolSettings {
    #[validate(range(min = 1))]
    pub downloaders: u32,
    #[validate(range(min = 1))]
    pub parsers: u32,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            downloaders: 20,
            parsers: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputConfig {
    Console,
    Json {
        path: String,
    },
    Csv {
        path: String,
    },
    Sqlite {
        path: String,
        #[serde(default = "default_table_name")]
        table: String,
    },
}

impl CrawlConfig {
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig::new(
            self.channels.request,
            self.channels.response,
            self.channels.item,
            self.channels.error,
        )
    }

    pub fn pool_config(&self) -> PoolBaseConfig {
        PoolBaseConfig::new(self.pools.downloaders, self.pools.parsers)
    }

    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis(self.feed_interval_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn summary_interval(&self) -> Duration {
        Duration::from_millis(self.summary_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

pub(crate) fn default_max_depth() -> u32 {
    2
}

pub(crate) fn default_feed_interval() -> u64 {
    10
}

pub(crate) fn default_monitor_interval() -> u64 {
    10
}

pub(crate) fn default_summary_interval() -> u64 {
    1000
}

pub(crate) fn default_idle_confirmations() -> u32 {
    3
}

pub(crate) fn default_request_timeout() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

fn default_table_name() -> String {
    "scraped_items".to_string()
}
