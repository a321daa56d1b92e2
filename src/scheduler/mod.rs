//! The crawl orchestrator.
//!
//! A [`Scheduler`] owns the channel manager, the downloader and parser pools,
//! the request cache and the stop sign for one crawl run. `start` launches
//! four pump loops:
//!
//! - feed: moves requests from the cache into the request channel, never
//!   more than the channel has room for;
//! - download: one task per request, each holding a pooled downloader;
//! - parse: one task per response, each holding a pooled parser;
//! - pipeline: one task per item, sent through the item processors.
//!
//! The last three share one receive loop (`pump`).
//!
//! Requests found while parsing go back into the cache through the admission
//! filter (scheme, duplicate URL, permitted domain, depth). `stop` raises the
//! stop sign and closes every channel; each loop then drains its in-flight
//! tasks and exits, which `join` waits for.

use crate::cache::RequestCache;
use crate::channels::{Channel, ChannelConfig, ChannelManager, ChannelManagerStatus};
use crate::domain::primary_domain;
use crate::downloader::{DownloaderFactory, DownloaderPool, HttpClientFactory};
use crate::error::{CrawlerError, ErrorKind, Result, SchedulerError};
use crate::model::{BaseData, DownloadRequest, DownloadResponse, HttpRequest, Item};
use crate::parser::{ParserPool, ResponseParser};
use crate::pipeline::{ItemPipeline, ItemProcessor};
use crate::pool::{Entity, IdGenerator, PoolBaseConfig};
use crate::stop_sign::StopSign;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle, JoinSet};

pub mod monitor;
pub mod summary;

pub use monitor::{Monitor, MonitorConfig};
pub use summary::{PoolUsage, SchedulerSummary};

pub const DOWNLOADER_CODE: &str = "downloader";
pub const PARSER_CODE: &str = "parser";
pub const ITEM_PIPELINE_CODE: &str = "item_pipeline";
pub const SCHEDULER_CODE: &str = "scheduler";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SchedulerStatus {
    Allocating = 0,
    Ready = 1,
    Starting = 2,
    Running = 3,
    Closed = 4,
    FatalError = 5,
}

impl SchedulerStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SchedulerStatus::Allocating,
            1 => SchedulerStatus::Ready,
            2 => SchedulerStatus::Starting,
            3 => SchedulerStatus::Running,
            4 => SchedulerStatus::Closed,
            _ => SchedulerStatus::FatalError,
        }
    }

    fn start_error(self) -> SchedulerError {
        match self {
            SchedulerStatus::Allocating => SchedulerError::Allocating,
            SchedulerStatus::Starting => SchedulerError::Starting,
            SchedulerStatus::Running => SchedulerError::Running,
            SchedulerStatus::Closed => SchedulerError::Closed,
            SchedulerStatus::Ready | SchedulerStatus::FatalError => SchedulerError::Fatal,
        }
    }
}

impl fmt::Display for SchedulerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulerStatus::Allocating => "allocating",
            SchedulerStatus::Ready => "ready",
            SchedulerStatus::Starting => "starting",
            SchedulerStatus::Running => "running",
            SchedulerStatus::Closed => "closed",
            SchedulerStatus::FatalError => "fatal error",
        };
        f.write_str(name)
    }
}

/// Where the pooled downloaders get their transport from.
#[derive(Clone)]
pub enum DownloaderSource {
    /// reqwest clients from the factory, or default clients.
    HttpClient(Option<HttpClientFactory>),
    Custom(DownloaderFactory),
}

impl Default for DownloaderSource {
    fn default() -> Self {
        DownloaderSource::HttpClient(None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    pub max_depth: u32,
    pub channel_config: ChannelConfig,
    pub pool_config: PoolBaseConfig,
    /// Pause between two feed rounds.
    pub feed_interval: Duration,
}

impl CrawlSettings {
    pub fn new(
        max_depth: u32,
        channel_config: ChannelConfig,
        pool_config: PoolBaseConfig,
    ) -> Self {
        Self {
            max_depth,
            channel_config,
            pool_config,
            feed_interval: Duration::from_millis(10),
        }
    }

    pub fn with_feed_interval(mut self, feed_interval: Duration) -> Self {
        self.feed_interval = feed_interval;
        self
    }
}

/// Handle to one crawl run. Clones share the same run.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    status: AtomicU8,
    settings: CrawlSettings,
    channels: ChannelManager,
    stop_sign: StopSign,
    dl_pool: DownloaderPool,
    parser_pool: ParserPool,
    parsers: Vec<ResponseParser>,
    pipeline: ItemPipeline,
    cache: RequestCache,
    accepted_domains: RwLock<HashSet<String>>,
    seen_urls: RwLock<HashSet<String>>,
    request_ids: IdGenerator,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

fn generate_code(prefix: &str, id: u32) -> String {
    format!("{}-{}", prefix, id)
}

fn error_kind(code: &str) -> ErrorKind {
    match code.split('-').next() {
        Some(DOWNLOADER_CODE) => ErrorKind::Downloader,
        Some(PARSER_CODE) => ErrorKind::Parser,
        Some(ITEM_PIPELINE_CODE) => ErrorKind::ItemProcessor,
        _ => ErrorKind::Scheduler,
    }
}

impl Scheduler {
    /// Validates the settings and allocates every component. Fails with a
    /// configuration error if any capacity, pool size or the depth is 0, or
    /// if no parser or processor is given.
    pub fn new(
        settings: CrawlSettings,
        downloaders: DownloaderSource,
        parsers: Vec<ResponseParser>,
        processors: Vec<Arc<dyn ItemProcessor>>,
    ) -> Result<Self> {
        if settings.max_depth == 0 {
            let reason = "max depth can not be 0".to_string();
            return Err(SchedulerError::InvalidArgument(reason).into());
        }
        if parsers.is_empty() {
            let reason = "no response parser given".to_string();
            return Err(SchedulerError::InvalidArgument(reason).into());
        }
        settings.channel_config.validate()?;
        settings.pool_config.validate()?;

        let channels = ChannelManager::new(settings.channel_config)?;
        let dl_pool = match downloaders {
            DownloaderSource::HttpClient(factory) => DownloaderPool::with_http_client_factory(
                settings.pool_config.downloader_pool_size(),
                factory,
            )?,
            DownloaderSource::Custom(factory) => DownloaderPool::with_downloader_factory(
                settings.pool_config.downloader_pool_size(),
                factory,
            )?,
        };
        let parser_pool = ParserPool::new(settings.pool_config.parser_pool_size())?;
        let pipeline = ItemPipeline::new(processors)?;

        let inner = Inner {
            status: AtomicU8::new(SchedulerStatus::Allocating as u8),
            settings,
            channels,
            stop_sign: StopSign::new(),
            dl_pool,
            parser_pool,
            parsers,
            pipeline,
            cache: RequestCache::new(),
            accepted_domains: RwLock::new(HashSet::new()),
            seen_urls: RwLock::new(HashSet::new()),
            request_ids: IdGenerator::new(),
            loops: Mutex::new(Vec::new()),
        };
        inner.set_status(SchedulerStatus::Ready);

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Launches the pump loops and enqueues `seed` at depth 0. The seed's
    /// domain becomes the first permitted domain. Must be called from within
    /// a Tokio runtime.
    pub fn start(&self, seed: HttpRequest) -> Result<()> {
        let inner = &self.inner;
        inner
            .transition(SchedulerStatus::Ready, SchedulerStatus::Starting)
            .map_err(SchedulerStatus::start_error)?;

        inner.pipeline.set_fail_fast(true);
        let requests = inner.channels.req_chan()?;
        let responses = inner.channels.resp_chan()?;
        let items = inner.channels.item_chan()?;

        inner.spawn_loop(Inner::pump(
            inner.clone(),
            requests.clone(),
            DOWNLOADER_CODE,
            Inner::download,
        ));
        inner.spawn_loop(Inner::pump(inner.clone(), responses, PARSER_CODE, Inner::parse));
        inner.spawn_loop(Inner::pump(
            inner.clone(),
            items,
            ITEM_PIPELINE_CODE,
            Inner::process_item,
        ));

        let host = seed.host().unwrap_or_default().to_string();
        if let Err(e) = self.add_permit_domain(&host) {
            log::error!("Add primary permit domain error: {}", e);
            inner.set_status(SchedulerStatus::FatalError);
            inner.shutdown();
            return Err(e);
        }

        let feed_interval = inner.settings.feed_interval;
        inner.spawn_loop(Inner::feed_loop(inner.clone(), requests, feed_interval));

        inner
            .transition(SchedulerStatus::Starting, SchedulerStatus::Running)
            .map_err(SchedulerStatus::start_error)?;

        let seed = DownloadRequest::new(inner.request_ids.next(), seed, 0);
        let url = seed.url().as_str().to_string();
        inner.cache.put(seed)?;
        inner.seen_urls.write().insert(url);
        Ok(())
    }

    /// Raises the stop sign, closes all channels and the request cache.
    pub fn stop(&self) -> Result<()> {
        let inner = &self.inner;
        if !inner.stop_sign.sign_stop() {
            return Err(SchedulerError::AlreadyStopped.into());
        }
        inner.close_components();
        if inner.status() != SchedulerStatus::FatalError {
            inner.set_status(SchedulerStatus::Closed);
        }
        log::info!("Scheduler stopped.");
        Ok(())
    }

    /// Waits for every pump loop to finish, then closes the item processors.
    pub async fn join(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inner.loops.lock());
        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                log::error!("Scheduler loop ended abnormally: {}", e);
            }
        }
        for e in self.inner.pipeline.close().await {
            log::error!("Item processor close error: {}", e);
        }
    }

    /// Resolves once `stop` has been called.
    pub async fn stopped(&self) {
        self.inner.stop_sign.wait().await
    }

    pub fn status(&self) -> SchedulerStatus {
        self.inner.status()
    }

    /// The error channel, while the channels are open.
    pub fn error_chan(&self) -> Option<Channel<CrawlerError>> {
        if self.inner.channels.status() != ChannelManagerStatus::Initialized {
            return None;
        }
        self.inner.channels.error_chan().ok()
    }

    /// Point-in-time check that nothing is queued or in flight. Counters are
    /// read one after another, so callers should see it hold several times in
    /// a row before acting on it.
    pub fn idle(&self) -> bool {
        let inner = &self.inner;
        let channels = inner.channels.summary();
        inner.cache.is_empty()
            && channels.request.len == 0
            && channels.response.len == 0
            && channels.item.len == 0
            && inner.dl_pool.used() == 0
            && inner.parser_pool.used() == 0
            && inner.pipeline.processing_num() == 0
    }

    /// Permits requests to `host`'s primary domain.
    pub fn add_permit_domain(&self, host: &str) -> Result<()> {
        let domain = primary_domain(host).inspect_err(|e| {
            log::error!("Add request domain error: {}", e);
        })?;
        self.inner.accepted_domains.write().insert(domain);
        Ok(())
    }

    pub fn summary(&self) -> SchedulerSummary {
        SchedulerSummary::collect(self)
    }

    pub fn settings(&self) -> CrawlSettings {
        self.inner.settings
    }

    pub fn stop_sign(&self) -> &StopSign {
        &self.inner.stop_sign
    }

    pub fn pipeline(&self) -> &ItemPipeline {
        &self.inner.pipeline
    }

    pub fn url_count(&self) -> usize {
        self.inner.seen_urls.read().len()
    }

    pub fn permitted_domains(&self) -> Vec<String> {
        let mut domains: Vec<String> = self.inner.accepted_domains.read().iter().cloned().collect();
        domains.sort();
        domains
    }
}

impl Inner {
    fn status(&self) -> SchedulerStatus {
        SchedulerStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    fn set_status(&self, status: SchedulerStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    /// Moves `from` to `to` atomically; on failure returns the status seen.
    fn transition(
        &self,
        from: SchedulerStatus,
        to: SchedulerStatus,
    ) -> std::result::Result<(), SchedulerStatus> {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(SchedulerStatus::from_u8)
    }

    fn spawn_loop<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.loops.lock().push(tokio::spawn(fut));
    }

    fn close_components(&self) {
        if let Err(e) = self.channels.close() {
            log::error!("Close channel manager error: {}", e);
        }
        self.cache.close();
    }

    /// Tears down a run that failed while starting.
    fn shutdown(&self) {
        if self.stop_sign.sign_stop() {
            self.close_components();
        }
    }

    async fn feed_loop(self: Arc<Self>, requests: Channel<DownloadRequest>, interval: Duration) {
        'feed: loop {
            if self.stop_sign.is_signed() {
                break;
            }
            if self.channels.status() == ChannelManagerStatus::Initialized {
                let mut remainder = requests.free_capacity();
                while remainder > 0 {
                    if self.stop_sign.is_signed() {
                        break 'feed;
                    }
                    let Some(req) = self.cache.get() else {
                        break;
                    };
                    if let Err(e) = requests.send(req).await {
                        log::debug!("Feed request error: {}", e);
                        break;
                    }
                    remainder -= 1;
                }
            }
            tokio::select! {
                _ = self.stop_sign.wait() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        self.stop_sign.record(SCHEDULER_CODE);
        log::debug!("Feed loop finished.");
    }

    /// Receives from `source` until it closes or the stop sign is raised,
    /// handling each value in its own task. Finished tasks are reaped as the
    /// loop goes and the rest are awaited before returning.
    async fn pump<T, F, Fut>(self: Arc<Self>, source: Channel<T>, stage: &'static str, handle: F)
    where
        T: Send + 'static,
        F: Fn(Arc<Self>, T) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut tasks = JoinSet::new();
        loop {
            while let Some(joined) = tasks.try_join_next() {
                report_task(stage, joined);
            }
            tokio::select! {
                received = source.recv() => match received {
                    Ok(value) => {
                        tasks.spawn(handle(self.clone(), value));
                    }
                    Err(e) => {
                        log::debug!("The {} loop stops receiving: {}", stage, e);
                        break;
                    }
                },
                _ = self.stop_sign.wait() => break,
            }
        }
        while let Some(joined) = tasks.join_next().await {
            report_task(stage, joined);
        }
        self.stop_sign.record(stage);
        log::debug!("The {} loop finished.", stage);
    }

    async fn process_item(self: Arc<Self>, item: Item) -> Result<()> {
        for e in self.pipeline.send(item).await {
            self.send_error(e, ITEM_PIPELINE_CODE);
        }
        Ok(())
    }

    /// The downloader stays checked out until the response is handed on.
    /// Tasks still waiting for a downloader when the stop sign is raised
    /// return without fetching.
    async fn download(self: Arc<Self>, req: DownloadRequest) -> Result<()> {
        let dl = tokio::select! {
            biased;
            _ = self.stop_sign.wait() => {
                self.stop_sign.record(DOWNLOADER_CODE);
                return Ok(());
            }
            taken = self.dl_pool.take() => match taken {
                Ok(dl) => dl,
                Err(e) => {
                    self.send_error(&e, SCHEDULER_CODE);
                    return Err(e.into());
                }
            },
        };
        let code = generate_code(DOWNLOADER_CODE, dl.id());
        if self.stop_sign.is_signed() {
            self.stop_sign.record(&code);
            return self.dl_pool.give_back(dl).map_err(Into::into);
        }

        match dl.download(&req).await {
            Ok(resp) => {
                self.send_resp(resp, &code).await;
            }
            Err(e) => {
                log::error!("Downloader error: {} (url={})", e, req.url());
                self.send_error(format!("{} (url={})", e, req.url()), &code);
            }
        }

        if let Err(e) = self.dl_pool.give_back(dl) {
            log::error!("Downloader pool error: {}", e);
            self.send_error(&e, SCHEDULER_CODE);
        }
        Ok(())
    }

    async fn parse(self: Arc<Self>, resp: DownloadResponse) -> Result<()> {
        let parser = tokio::select! {
            biased;
            _ = self.stop_sign.wait() => {
                self.stop_sign.record(PARSER_CODE);
                return Ok(());
            }
            taken = self.parser_pool.take() => match taken {
                Ok(parser) => parser,
                Err(e) => {
                    self.send_error(&e, SCHEDULER_CODE);
                    return Err(e.into());
                }
            },
        };
        let code = generate_code(PARSER_CODE, parser.id());
        if self.stop_sign.is_signed() {
            self.stop_sign.record(&code);
            return self.parser_pool.give_back(parser).map_err(Into::into);
        }

        let (data_list, errors) = parser.parse_page(&self.parsers, &resp);
        for e in errors {
            self.send_error(e, &code);
        }
        for data in data_list {
            match data {
                BaseData::Request(req) if req.is_valid() => {
                    self.send_req_to_cache(req, &code);
                }
                BaseData::Item(item) => {
                    self.send_item(item, &code).await;
                }
                other => {
                    self.send_error(
                        format!("Unsupported data type '{}' without depth", other.kind()),
                        &code,
                    );
                }
            }
        }

        if let Err(e) = self.parser_pool.give_back(parser) {
            log::error!("Parser pool error: {}", e);
            self.send_error(&e, SCHEDULER_CODE);
        }
        Ok(())
    }

    /// Reports an error on the error channel without blocking the caller.
    /// Skipped once the stop sign is raised.
    fn send_error(&self, err: impl fmt::Display, code: &str) -> bool {
        let err = CrawlerError::new(error_kind(code), err.to_string());
        if self.stop_sign.is_signed() {
            self.stop_sign.record(code);
            return false;
        }
        let Ok(errors) = self.channels.error_chan() else {
            return false;
        };
        tokio::spawn(async move {
            if let Err(e) = errors.send(err).await {
                log::debug!("Dropped crawler error: {}", e);
            }
        });
        true
    }

    async fn send_resp(&self, resp: DownloadResponse, code: &str) -> bool {
        if self.stop_sign.is_signed() {
            self.stop_sign.record(code);
            return false;
        }
        let sent = match self.channels.resp_chan() {
            Ok(responses) => responses.send(resp).await,
            Err(e) => Err(e),
        };
        sent.inspect_err(|e| log::debug!("Send response error: {}", e))
            .is_ok()
    }

    async fn send_item(&self, item: Item, code: &str) -> bool {
        if self.stop_sign.is_signed() {
            self.stop_sign.record(code);
            return false;
        }
        let sent = match self.channels.item_chan() {
            Ok(items) => items.send(item).await,
            Err(e) => Err(e),
        };
        sent.inspect_err(|e| log::debug!("Send item error: {}", e))
            .is_ok()
    }

    /// Admission filter for requests found while parsing.
    ///
    /// The duplicate check and the insert into the seen set are separate
    /// critical sections, so two parse tasks finding the same URL at the same
    /// moment may both admit it.
    fn send_req_to_cache(&self, req: DownloadRequest, code: &str) -> bool {
        let url = req.url();
        if url.scheme() != "http" {
            if url.scheme() == "javascript" {
                log::debug!("Ignore request scheme '{}'.", url.scheme());
                return false;
            }
            log::debug!("Find request {}, scheme '{}'.", url, url.scheme());
        }

        let key = url.as_str().to_string();
        if self.seen_urls.read().contains(&key) {
            log::debug!("Ignore the request! Its url is repeated. (requestUrl={})", url);
            return false;
        }

        let domain = match url.host_str().map(primary_domain) {
            Some(Ok(domain)) => domain,
            _ => {
                log::debug!("Ignore the request! Its host is invalid. (requestUrl={})", url);
                return false;
            }
        };
        if !self.accepted_domains.read().contains(&domain) {
            log::debug!(
                "Ignore the request! Its host '{}' is not in a permitted domain. (requestUrl={})",
                url.host_str().unwrap_or_default(),
                url
            );
            return false;
        }

        if req.depth() > self.settings.max_depth {
            log::debug!(
                "Ignore the request! Its depth {} is greater than {}. (requestUrl={})",
                req.depth(),
                self.settings.max_depth,
                url
            );
            return false;
        }

        if self.stop_sign.is_signed() {
            self.stop_sign.record(code);
            return false;
        }

        let req = req.with_id(self.request_ids.next());
        if let Err(e) = self.cache.put(req) {
            log::warn!("Put request into cache error: {}", e);
            return false;
        }
        self.seen_urls.write().insert(key);
        true
    }
}

fn report_task(stage: &str, joined: std::result::Result<Result<()>, JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::error!("The {} task failed: {}", stage, e),
        Err(e) if e.is_panic() => log::error!("Fatal {} error: {}", stage, e),
        Err(e) => log::warn!("The {} task was cancelled: {}", stage, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::Downloader;
    use crate::error::Error;
    use crate::model::HttpResponse;
    use crate::pipeline::FnProcessor;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use reqwest::header::HeaderMap;

    struct EmptyPage;

    #[async_trait]
    impl Downloader for EmptyPage {
        async fn download(&self, request: &HttpRequest) -> Result<HttpResponse> {
            Ok(HttpResponse {
                url: request.url.clone(),
                status: StatusCode::OK,
                headers: HeaderMap::new(),
                body: String::new(),
            })
        }
    }

    fn scheduler(max_depth: u32) -> Scheduler {
        let settings = CrawlSettings::new(
            max_depth,
            ChannelConfig::new(4, 4, 4, 4),
            PoolBaseConfig::new(2, 2),
        );
        Scheduler::new(
            settings,
            DownloaderSource::Custom(Arc::new(|| Arc::new(EmptyPage) as Arc<dyn Downloader>)),
            vec![crate::parser::html::link_parser()],
            vec![Arc::new(FnProcessor::new(Ok))],
        )
        .unwrap()
    }

    fn request(url: &str, depth: u32) -> DownloadRequest {
        DownloadRequest::new(0, HttpRequest::parse(url).unwrap(), depth)
    }

    fn admit(scheduler: &Scheduler, url: &str, depth: u32) -> bool {
        scheduler
            .inner
            .send_req_to_cache(request(url, depth), "parser-0")
    }

    #[test]
    fn test_new_is_ready() {
        let scheduler = scheduler(1);
        assert_eq!(scheduler.status(), SchedulerStatus::Ready);
        assert!(scheduler.idle());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let build = |settings: CrawlSettings| {
            Scheduler::new(
                settings,
                DownloaderSource::default(),
                vec![crate::parser::html::link_parser()],
                vec![Arc::new(FnProcessor::new(Ok))],
            )
        };
        let channels = ChannelConfig::new(1, 1, 1, 1);
        let pools = PoolBaseConfig::new(1, 1);

        assert!(matches!(
            build(CrawlSettings::new(0, channels, pools)),
            Err(Error::Scheduler(SchedulerError::InvalidArgument(_)))
        ));
        assert!(build(CrawlSettings::new(1, ChannelConfig::new(1, 1, 0, 1), pools)).is_err());
        assert!(build(CrawlSettings::new(1, channels, PoolBaseConfig::new(0, 1))).is_err());
        assert!(
            Scheduler::new(
                CrawlSettings::new(1, channels, pools),
                DownloaderSource::default(),
                Vec::new(),
                vec![Arc::new(FnProcessor::new(Ok))],
            )
            .is_err()
        );
        assert!(
            Scheduler::new(
                CrawlSettings::new(1, channels, pools),
                DownloaderSource::default(),
                vec![crate::parser::html::link_parser()],
                Vec::new(),
            )
            .is_err()
        );
    }

    #[test]
    fn test_admission_rejects_repeated_url() {
        let scheduler = scheduler(2);
        scheduler.add_permit_domain("example.test").unwrap();

        assert!(admit(&scheduler, "http://example.test/a", 1));
        assert!(!admit(&scheduler, "http://example.test/a", 1));
        assert_eq!(scheduler.inner.cache.len(), 1);
        assert_eq!(scheduler.url_count(), 1);
    }

    #[test]
    fn test_admission_rejects_unpermitted_domain() {
        let scheduler = scheduler(2);
        scheduler.add_permit_domain("example.test").unwrap();

        assert!(!admit(&scheduler, "http://other.test/a", 1));
        assert!(admit(&scheduler, "http://www.example.test/a", 1));

        scheduler.add_permit_domain("blog.other.test").unwrap();
        assert!(admit(&scheduler, "http://other.test/a", 1));
    }

    #[test]
    fn test_admission_depth_boundary() {
        let scheduler = scheduler(2);
        scheduler.add_permit_domain("example.test").unwrap();

        assert!(!admit(&scheduler, "http://example.test/deep", 3));
        assert!(admit(&scheduler, "http://example.test/deep", 2));
    }

    #[test]
    fn test_admission_schemes() {
        let scheduler = scheduler(2);
        scheduler.add_permit_domain("example.test").unwrap();

        assert!(!admit(&scheduler, "javascript:void(0)", 1));
        assert!(admit(&scheduler, "https://example.test/secure", 1));
    }

    #[test]
    fn test_admission_after_stop() {
        let scheduler = scheduler(2);
        scheduler.add_permit_domain("example.test").unwrap();
        scheduler.stop().unwrap();

        assert!(!admit(&scheduler, "http://example.test/a", 1));
        assert_eq!(scheduler.stop_sign().record_count("parser-0"), 1);
    }

    #[test]
    fn test_error_kind_from_code() {
        assert_eq!(error_kind(&generate_code(DOWNLOADER_CODE, 3)), ErrorKind::Downloader);
        assert_eq!(error_kind(&generate_code(PARSER_CODE, 0)), ErrorKind::Parser);
        assert_eq!(error_kind(ITEM_PIPELINE_CODE), ErrorKind::ItemProcessor);
        assert_eq!(error_kind(SCHEDULER_CODE), ErrorKind::Scheduler);
    }

    #[tokio::test]
    async fn test_start_rejects_seed_without_host() {
        let scheduler = scheduler(1);
        let seed = HttpRequest::parse("data:text/plain,hello").unwrap();

        assert!(scheduler.start(seed).is_err());
        assert_eq!(scheduler.status(), SchedulerStatus::FatalError);
        assert!(scheduler.stop_sign().is_signed());

        let again = scheduler.start(HttpRequest::parse("http://example.test/").unwrap());
        assert!(matches!(
            again,
            Err(Error::Scheduler(SchedulerError::Fatal))
        ));
        scheduler.join().await;
    }
}
