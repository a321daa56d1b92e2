use super::{Scheduler, SchedulerStatus};
use crate::cache::CacheSummary;
use crate::channels::{ChannelConfig, ChannelManagerSummary};
use crate::pipeline::PipelineSummary;
use crate::pool::PoolBaseConfig;
use crate::stop_sign::StopSignSummary;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolUsage {
    pub used: u32,
    pub total: u32,
}

impl fmt::Display for PoolUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.used, self.total)
    }
}

/// Snapshot of a scheduler's state. Two snapshots compare equal when nothing
/// observable changed between them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerSummary {
    pub status: SchedulerStatus,
    pub channel_config: ChannelConfig,
    pub pool_config: PoolBaseConfig,
    pub max_depth: u32,
    pub channels: ChannelManagerSummary,
    pub request_cache: CacheSummary,
    pub downloader_pool: PoolUsage,
    pub parser_pool: PoolUsage,
    pub item_pipeline: PipelineSummary,
    pub url_count: usize,
    pub permitted_domains: Vec<String>,
    pub stop_sign: StopSignSummary,
}

impl SchedulerSummary {
    pub(crate) fn collect(scheduler: &Scheduler) -> Self {
        let inner = &scheduler.inner;
        Self {
            status: inner.status(),
            channel_config: inner.settings.channel_config,
            pool_config: inner.settings.pool_config,
            max_depth: inner.settings.max_depth,
            channels: inner.channels.summary(),
            request_cache: inner.cache.summary(),
            downloader_pool: PoolUsage {
                used: inner.dl_pool.used(),
                total: inner.dl_pool.total(),
            },
            parser_pool: PoolUsage {
                used: inner.parser_pool.used(),
                total: inner.parser_pool.total(),
            },
            item_pipeline: inner.pipeline.summary(),
            url_count: scheduler.url_count(),
            permitted_domains: scheduler.permitted_domains(),
            stop_sign: inner.stop_sign.summary(),
        }
    }

    pub fn same(&self, other: &SchedulerSummary) -> bool {
        self == other
    }

    /// Multi-line form including the permitted domain list.
    pub fn detail(&self) -> String {
        self.render(true)
    }

    fn render(&self, detail: bool) -> String {
        let domains = if detail {
            format!("{:?}", self.permitted_domains)
        } else {
            "<concealed>".to_string()
        };
        format!(
            "Status: {}\n\
             Channel args: {}\n\
             Pool base config: {}\n\
             Crawl depth: {}\n\
             Channels: {}\n\
             Request cache: {}\n\
             Downloader pool: {}\n\
             Parser pool: {}\n\
             Item pipeline: {}\n\
             Urls({}), permitted domains: {}\n\
             Stop sign: {}\n",
            self.status,
            self.channel_config,
            self.pool_config,
            self.max_depth,
            self.channels,
            self.request_cache,
            self.downloader_pool,
            self.parser_pool,
            self.item_pipeline,
            self.url_count,
            domains,
            self.stop_sign
        )
    }
}

impl fmt::Display for SchedulerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(false))
    }
}
