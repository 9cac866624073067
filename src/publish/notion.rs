use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{NewRecord, RecordStore, StoreError};
use crate::http::HttpClient;

pub const DEFAULT_NOTION_BASE_URL: &str = "https://api.notion.com/v1";
pub const DEFAULT_NOTION_VERSION: &str = "2022-06-28";
const STORE_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone, Debug)]
pub struct NotionConfig {
    pub token: String,
    pub database_id: String,
    pub version: String,
    pub base_url: String,
}

impl NotionConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        Ok(Self {
            token: var("NOTION_TOKEN").ok_or(StoreError::MissingConfig("NOTION_TOKEN"))?,
            database_id: var("NOTION_DATABASE_ID").ok_or(StoreError::MissingConfig("NOTION_DATABASE_ID"))?,
            version: var("NOTION_VERSION").unwrap_or_else(|| DEFAULT_NOTION_VERSION.to_string()),
            base_url: var("NOTION_BASE_URL").unwrap_or_else(|| DEFAULT_NOTION_BASE_URL.to_string()),
        })
    }
}

/// Notion database as the record store. Properties: Title, Published, URL, UID, Source, Tags.
pub struct NotionStore {
    http: HttpClient,
    cfg: NotionConfig,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<PageRef>,
}

#[derive(Deserialize)]
struct PageRef {
    id: String,
}

impl NotionStore {
    pub fn new(http: HttpClient, cfg: NotionConfig) -> Self {
        Self { http, cfg }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.cfg.token)
            .header("Notion-Version", &self.cfg.version)
            .timeout(STORE_TIMEOUT)
    }

    async fn expect_ok(resp: Response) -> Result<Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body: String = resp.text().await.unwrap_or_default().chars().take(400).collect();
        Err(StoreError::Status { status, body })
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, StoreError> {
        resp.json::<T>().await.map_err(|e| StoreError::Decode(e.to_string()))
    }
}

pub fn query_body(uid: &str, url: &str) -> Value {
    json!({
        "filter": { "or": [
            { "property": "UID", "rich_text": { "equals": uid } },
            { "property": "URL", "url": { "equals": url } }
        ]},
        "page_size": 1
    })
}

pub fn page_properties(record: &NewRecord) -> Value {
    let mut props = json!({
        "Title": { "title": [ { "text": { "content": record.title } } ] },
        "Published": { "date": { "start": record.published.to_rfc3339_opts(SecondsFormat::Secs, false) } },
        "URL": { "url": record.url },
        "UID": { "rich_text": [ { "text": { "content": record.uid } } ] },
        "Source": { "select": { "name": record.source } },
    });
    if !record.tags.is_empty() {
        props["Tags"] = json!({ "multi_select": record.tags.iter().map(|t| json!({ "name": t })).collect::<Vec<_>>() });
    }
    props
}

pub fn bullet_blocks(bullets: &[String]) -> Value {
    let children: Vec<Value> = bullets
        .iter()
        .map(|b| {
            json!({
                "object": "block",
                "type": "bulleted_list_item",
                "bulleted_list_item": { "rich_text": [ { "type": "text", "text": { "content": b } } ] }
            })
        })
        .collect();
    json!({ "children": children })
}

#[async_trait]
impl RecordStore for NotionStore {
    async fn find(&self, uid: &str, url: &str) -> Result<Option<String>, StoreError> {
        let path = format!("/databases/{}/query", self.cfg.database_id);
        let req = self.authed(self.http.client().post(self.url(&path))).json(&query_body(uid, url));
        // a query has no side effects, so it may be retried
        let resp = Self::expect_ok(self.http.send(req, true).await?).await?;
        let parsed: QueryResponse = Self::decode(resp).await?;
        Ok(parsed.results.into_iter().next().map(|p| p.id))
    }

    async fn create_record(&self, record: &NewRecord) -> Result<String, StoreError> {
        let body = json!({
            "parent": { "database_id": self.cfg.database_id },
            "properties": page_properties(record),
        });
        let req = self.authed(self.http.client().post(self.url("/pages"))).json(&body);
        let resp = Self::expect_ok(self.http.send(req, false).await?).await?;
        let page: PageRef = Self::decode(resp).await?;
        Ok(page.id)
    }

    async fn append_bullets(&self, record_id: &str, bullets: &[String]) -> Result<(), StoreError> {
        let path = format!("/blocks/{record_id}/children");
        let req = self.authed(self.http.client().patch(self.url(&path))).json(&bullet_blocks(bullets));
        Self::expect_ok(self.http.send(req, false).await?).await?;
        Ok(())
    }
}
