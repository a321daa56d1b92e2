pub mod cache;
pub mod channels;
pub mod config;
pub mod domain;
pub mod downloader;
pub mod error;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod pool;
pub mod scheduler;
pub mod stop_sign;

pub use channels::{ChannelConfig, ChannelManager};
pub use error::{CrawlerError, Error, ErrorKind, Result};
pub use model::{BaseData, DownloadRequest, DownloadResponse, HttpRequest, HttpResponse, Item};
pub use parser::ResponseParser;
pub use pipeline::{ItemPipeline, ItemProcessor};
pub use pool::PoolBaseConfig;
pub use scheduler::{
    CrawlSettings, DownloaderSource, Monitor, MonitorConfig, Scheduler, SchedulerStatus,
    SchedulerSummary,
};
