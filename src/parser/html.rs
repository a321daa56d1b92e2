//! Response parsers for HTML pages.

use super::ResponseParser;
use crate::error::Error;
use crate::model::{BaseData, DownloadRequest, HttpRequest, HttpResponse, Item};
use select::document::Document;
use select::predicate::Name;
use serde_json::json;
use std::sync::Arc;

/// Emits one request per `<a href>` on the page.
pub fn link_parser() -> ResponseParser {
    Arc::new(parse_links)
}

/// Emits an item holding the page `<title>`.
pub fn title_parser() -> ResponseParser {
    Arc::new(parse_title)
}

pub fn parse_links(resp: &HttpResponse, _depth: u32) -> (Vec<BaseData>, Vec<Error>) {
    if !resp.status.is_success() {
        return (
            Vec::new(),
            vec![Error::Extraction(format!(
                "Unsupported status code {} (url={})",
                resp.status, resp.url
            ))],
        );
    }

    let doc = Document::from(resp.body.as_str());
    let mut data_list = Vec::new();
    let mut error_list = Vec::new();

    for href in doc.find(Name("a")).filter_map(|node| node.attr("href")) {
        let href = href.trim();
        if href.is_empty() || href == "#" || href == "/" {
            continue;
        }
        match resp.url.join(href) {
            Ok(mut url) => {
                url.set_fragment(None);
                log::debug!("Find new http request: {}", url);
                data_list.push(BaseData::Request(DownloadRequest::derived(
                    HttpRequest::get(url),
                )));
            }
            Err(e) => error_list.push(Error::Url(e)),
        }
    }

    (data_list, error_list)
}

pub fn parse_title(resp: &HttpResponse, depth: u32) -> (Vec<BaseData>, Vec<Error>) {
    if !resp.status.is_success() {
        return (Vec::new(), Vec::new());
    }

    let doc = Document::from(resp.body.as_str());
    let title = doc
        .find(Name("title"))
        .map(|node| node.text().trim().to_string())
        .find(|text| !text.is_empty());

    match title {
        Some(title) => {
            let mut item = Item::new();
            item.insert("title".to_string(), json!(title));
            item.insert("url".to_string(), json!(resp.url.as_str()));
            item.insert("depth".to_string(), json!(depth));
            item.insert(
                "fetched_at".to_string(),
                json!(chrono::Utc::now().to_rfc3339()),
            );
            (vec![BaseData::Item(item)], Vec::new())
        }
        None => (Vec::new(), Vec::new()),
    }
}
