use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Item processing error: {0}")]
    Processing(String),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("The pool can not be initialized with size 0")]
    InvalidSize,

    #[error("The entity factory produced a duplicate id {0}")]
    DuplicateEntity(u32),

    #[error("The pool has been closed")]
    Closed,

    #[error("The entity (id={0}) does not belong to the pool")]
    UnknownEntity(u32),

    #[error("The entity (id={0}) is already in the pool")]
    NotCheckedOut(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("The {0} channel capacity can not be 0")]
    InvalidCapacity(&'static str),

    #[error("The channel manager has been initialized")]
    AlreadyInitialized,

    #[error("Cannot close an uninitialized channel manager")]
    CloseUninitialized,

    #[error("The undesirable status of channel manager: {0}")]
    UndesirableStatus(String),

    #[error("The {0} channel has been closed")]
    Closed(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("The request cache has been closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("The scheduler is initializing, please try later")]
    Allocating,

    #[error("The scheduler is already starting")]
    Starting,

    #[error("The scheduler has been started")]
    Running,

    #[error("The scheduler is closed")]
    Closed,

    #[error("The scheduler has encountered a fatal error")]
    Fatal,

    #[error("The scheduler has been stopped")]
    AlreadyStopped,

    #[error("Invalid domain for host '{0}'")]
    InvalidDomain(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Stage a [`CrawlerError`] originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Downloader,
    Parser,
    ItemProcessor,
    Scheduler,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Downloader => "Downloader Error",
            ErrorKind::Parser => "PageParser Error",
            ErrorKind::ItemProcessor => "Item Processor Error",
            ErrorKind::Scheduler => "Scheduler Error",
        };
        f.write_str(label)
    }
}

/// An error reported on the scheduler's error channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Crawler Error: {kind}: {message}")]
pub struct CrawlerError {
    kind: ErrorKind,
    message: String,
}

impl CrawlerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
