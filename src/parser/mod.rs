use crate::error::{Error, PoolError};
use crate::model::{BaseData, DownloadResponse, HttpResponse};
use crate::pool::{Entity, EntityPool, IdGenerator};
use std::sync::Arc;

pub mod html;

/// Turns a response body into new requests and items. Receives the depth of
/// the response being parsed.
pub type ResponseParser =
    Arc<dyn Fn(&HttpResponse, u32) -> (Vec<BaseData>, Vec<Error>) + Send + Sync>;

/// A pooled parser instance; runs every response parser against a response.
#[derive(Debug, Clone)]
pub struct PageParser {
    id: u32,
}

impl PageParser {
    pub fn new(id: u32) -> Self {
        Self { id }
    }

    /// Concatenates the output of all `parsers`. Requests found on the page
    /// are placed one level below the response.
    pub fn parse_page(
        &self,
        parsers: &[ResponseParser],
        resp: &DownloadResponse,
    ) -> (Vec<BaseData>, Vec<Error>) {
        if parsers.is_empty() {
            return (
                Vec::new(),
                vec![Error::Extraction("No response parser given".to_string())],
            );
        }

        let http_resp = resp.response();
        log::info!("Begin parse the response (reqUrl={})...", http_resp.url);

        let depth = resp.depth();
        let mut data_list = Vec::new();
        let mut error_list = Vec::new();
        for parser in parsers {
            let (data, errors) = parser(http_resp, depth);
            data_list.extend(data.into_iter().map(|data| match data {
                BaseData::Request(req) if req.depth() != depth + 1 => {
                    BaseData::Request(req.with_depth(depth + 1))
                }
                other => other,
            }));
            error_list.extend(errors);
        }
        (data_list, error_list)
    }
}

impl Entity for PageParser {
    fn id(&self) -> u32 {
        self.id
    }
}

pub struct ParserPool {
    pool: EntityPool<PageParser>,
}

impl ParserPool {
    pub fn new(total: u32) -> Result<Self, PoolError> {
        let ids = IdGenerator::new();
        let pool = EntityPool::new(total, || PageParser::new(ids.next_u32()))?;
        Ok(Self { pool })
    }

    pub async fn take(&self) -> Result<PageParser, PoolError> {
        self.pool.take().await
    }

    pub fn give_back(&self, parser: PageParser) -> Result<(), PoolError> {
        self.pool.give_back(parser)
    }

    pub fn total(&self) -> u32 {
        self.pool.total()
    }

    pub fn used(&self) -> u32 {
        self.pool.used()
    }
}
