use serde::Serialize;

#[derive(Serialize)]
pub struct CacheRow {
    pub feed_url: String,
    pub etag: Option<String>,
    pub modified: Option<String>,
}

#[derive(Serialize)]
pub struct CacheList {
    pub path: String,
    pub feeds: Vec<CacheRow>,
}

#[derive(Serialize)]
pub struct CacheClearPlan {
    pub path: String,
    pub feed_url: Option<String>,
    pub matching: usize,
}

#[derive(Serialize)]
pub struct CacheClearResult {
    pub path: String,
    pub removed: usize,
}
