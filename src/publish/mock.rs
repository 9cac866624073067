use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::{NewRecord, RecordStore, StoreError};

#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    Find { uid: String, url: String },
    Create(NewRecord),
    Append { record_id: String, count: usize },
}

/// In-memory store: remembers created uids and records every call.
#[derive(Debug, Default)]
pub struct MockStore {
    existing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<StoreCall>>,
    fail_find: Mutex<bool>,
    fail_create: Mutex<bool>,
    fail_append: Mutex<bool>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_existing(&self, uid: &str) {
        self.existing.lock().unwrap().insert(uid.to_string());
    }

    pub fn fail_find(&self, on: bool) {
        *self.fail_find.lock().unwrap() = on;
    }

    pub fn fail_create(&self, on: bool) {
        *self.fail_create.lock().unwrap() = on;
    }

    pub fn fail_append(&self, on: bool) {
        *self.fail_append.lock().unwrap() = on;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, StoreCall::Create(_))).count()
    }

    pub fn created_titles(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                StoreCall::Create(r) => Some(r.title),
                _ => None,
            })
            .collect()
    }

    pub fn append_sizes(&self) -> Vec<usize> {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                StoreCall::Append { count, .. } => Some(*count),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn unavailable() -> StoreError {
    StoreError::Status { status: StatusCode::SERVICE_UNAVAILABLE, body: "mock failure".into() }
}

#[async_trait]
impl RecordStore for MockStore {
    async fn find(&self, uid: &str, url: &str) -> Result<Option<String>, StoreError> {
        self.record(StoreCall::Find { uid: uid.into(), url: url.into() });
        if *self.fail_find.lock().unwrap() {
            return Err(unavailable());
        }
        Ok(self.existing.lock().unwrap().contains(uid).then(|| format!("page-{uid}")))
    }

    async fn create_record(&self, record: &NewRecord) -> Result<String, StoreError> {
        self.record(StoreCall::Create(record.clone()));
        if *self.fail_create.lock().unwrap() {
            return Err(unavailable());
        }
        self.insert_existing(&record.uid);
        Ok(format!("page-{}", record.uid))
    }

    async fn append_bullets(&self, record_id: &str, bullets: &[String]) -> Result<(), StoreError> {
        self.record(StoreCall::Append { record_id: record_id.into(), count: bullets.len() });
        if *self.fail_append.lock().unwrap() {
            return Err(unavailable());
        }
        Ok(())
    }
}
