use crate::error::{PoolError, Result};
use crate::model::{DownloadRequest, DownloadResponse, HttpRequest, HttpResponse};
use crate::pool::{Entity, EntityPool, IdGenerator};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;

/// Fetches one request. The transport behind it is up to the implementation.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

pub type HttpClientFactory = Arc<dyn Fn() -> Client + Send + Sync>;
pub type DownloaderFactory = Arc<dyn Fn() -> Arc<dyn Downloader> + Send + Sync>;

/// [`Downloader`] backed by a reqwest client.
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpDownloader {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, request: &HttpRequest) -> Result<HttpResponse> {
        log::info!("Do the request (url={})...", request.url);

        let res = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await?;
        let url = res.url().clone();
        let status = res.status();
        let headers = res.headers().clone();
        let body = res.text().await?;
        log::debug!("Downloaded {} bytes from {}", body.len(), url);

        Ok(HttpResponse {
            url,
            status,
            headers,
            body,
        })
    }
}

/// A pooled downloader instance.
#[derive(Clone)]
pub struct PageDownloader {
    id: u32,
    inner: Arc<dyn Downloader>,
}

impl PageDownloader {
    pub fn new(id: u32, inner: Arc<dyn Downloader>) -> Self {
        Self { id, inner }
    }

    pub async fn download(&self, req: &DownloadRequest) -> Result<DownloadResponse> {
        let response = self.inner.download(req.request()).await?;
        Ok(DownloadResponse::new(req.id(), response, req.depth()))
    }
}

impl Entity for PageDownloader {
    fn id(&self) -> u32 {
        self.id
    }
}

pub struct DownloaderPool {
    pool: EntityPool<PageDownloader>,
}

impl DownloaderPool {
    /// One reqwest-backed downloader per slot. Without a factory each gets a
    /// default client.
    pub fn with_http_client_factory(
        total: u32,
        factory: Option<HttpClientFactory>,
    ) -> std::result::Result<Self, PoolError> {
        let factory = factory.unwrap_or_else(|| Arc::new(Client::new) as HttpClientFactory);
        Self::with_downloader_factory(
            total,
            Arc::new(move || Arc::new(HttpDownloader::new(factory())) as Arc<dyn Downloader>),
        )
    }

    pub fn with_downloader_factory(
        total: u32,
        factory: DownloaderFactory,
    ) -> std::result::Result<Self, PoolError> {
        let ids = IdGenerator::new();
        let pool = EntityPool::new(total, || PageDownloader::new(ids.next_u32(), factory()))
            .inspect_err(|e| log::error!("New downloader pool error: {}", e))?;
        Ok(Self { pool })
    }

    pub async fn take(&self) -> std::result::Result<PageDownloader, PoolError> {
        self.pool.take().await
    }

    pub fn give_back(&self, downloader: PageDownloader) -> std::result::Result<(), PoolError> {
        self.pool.give_back(downloader)
    }

    pub fn total(&self) -> u32 {
        self.pool.total()
    }

    pub fn used(&self) -> u32 {
        self.pool.used()
    }
}
