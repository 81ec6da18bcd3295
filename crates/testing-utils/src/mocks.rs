//! In-memory mock implementations of the repository and client traits
//!
//! The mocks follow the same matching rules as the SQL stores so that
//! pipeline components can be tested without a database or network.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventory_core::{
    HostRecord, HostRepository, InventoryError, InventoryResult, LinkClaim, LinkRecord,
    LinkRepository, SourceClient, WorkItem,
};
use serde_json::{json, Value};

/// Mock implementation of LinkRepository for testing
#[derive(Debug, Clone, Default)]
pub struct MockLinkRepository {
    links: Arc<Mutex<BTreeMap<String, LinkRecord>>>,
    failing_claims: Arc<Mutex<u32>>,
}

impl MockLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_links(links: Vec<LinkRecord>) -> Self {
        let repo = Self::new();
        {
            let mut map = repo.links.lock().unwrap();
            for link in links {
                map.insert(link.source_type.clone(), link);
            }
        }
        repo
    }

    /// The next `count` claims fail with a database error
    pub fn fail_next_claims(&self, count: u32) {
        *self.failing_claims.lock().unwrap() = count;
    }

    pub fn get(&self, source_type: &str) -> Option<LinkRecord> {
        self.links.lock().unwrap().get(source_type).cloned()
    }
}

#[async_trait]
impl LinkRepository for MockLinkRepository {
    async fn seed_links(&self, links: &[LinkRecord]) -> InventoryResult<u64> {
        let mut map = self.links.lock().unwrap();
        let mut inserted = 0;
        for link in links {
            if !map.contains_key(&link.source_type) {
                map.insert(link.source_type.clone(), link.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn set_endpoint(&self, source_type: &str, endpoint: &str) -> InventoryResult<bool> {
        let mut map = self.links.lock().unwrap();
        match map.get_mut(source_type) {
            Some(link) => {
                link.endpoint = endpoint.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_by_source_type(&self, source_type: &str) -> InventoryResult<Option<LinkRecord>> {
        Ok(self.get(source_type))
    }

    async fn list(&self) -> InventoryResult<Vec<LinkRecord>> {
        Ok(self.links.lock().unwrap().values().cloned().collect())
    }

    async fn due_links(
        &self,
        now: DateTime<Utc>,
        refresh_interval: chrono::Duration,
    ) -> InventoryResult<Vec<LinkRecord>> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .values()
            .filter(|link| link.is_due(now, refresh_interval))
            .cloned()
            .collect())
    }

    async fn mark_checked(&self, source_type: &str, now: DateTime<Utc>) -> InventoryResult<()> {
        if let Some(link) = self.links.lock().unwrap().get_mut(source_type) {
            link.last_checked = now;
        }
        Ok(())
    }

    async fn claim_due_links(
        &self,
        now: DateTime<Utc>,
        refresh_interval: chrono::Duration,
    ) -> InventoryResult<Box<dyn LinkClaim>> {
        {
            let mut failing = self.failing_claims.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(InventoryError::Database(sqlx::Error::PoolTimedOut));
            }
        }

        let links = self.due_links(now, refresh_interval).await?;
        Ok(Box::new(MockLinkClaim {
            store: self.links.clone(),
            links,
            pending: Vec::new(),
            committed: false,
        }))
    }
}

/// Claim over the mock registry; marks apply only on commit
pub struct MockLinkClaim {
    store: Arc<Mutex<BTreeMap<String, LinkRecord>>>,
    links: Vec<LinkRecord>,
    pending: Vec<(String, DateTime<Utc>)>,
    committed: bool,
}

#[async_trait]
impl LinkClaim for MockLinkClaim {
    fn links(&self) -> &[LinkRecord] {
        &self.links
    }

    async fn mark_checked(&mut self, source_type: &str, now: DateTime<Utc>) -> InventoryResult<()> {
        self.pending.push((source_type.to_string(), now));
        Ok(())
    }

    async fn commit(&mut self) -> InventoryResult<()> {
        if self.committed {
            return Err(InventoryError::Internal("claim already committed".to_string()));
        }
        let mut store = self.store.lock().unwrap();
        for (source_type, now) in self.pending.drain(..) {
            if let Some(link) = store.get_mut(&source_type) {
                link.last_checked = now;
            }
        }
        self.committed = true;
        Ok(())
    }
}

/// Mock implementation of HostRepository for testing
///
/// Rows keep insertion order; absent identity parts compare as empty.
#[derive(Debug, Clone, Default)]
pub struct MockHostRepository {
    rows: Arc<Mutex<Vec<HostRecord>>>,
    failing_hosts: Arc<Mutex<Vec<String>>>,
    writes: Arc<Mutex<u32>>,
}

fn key(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn nullable(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl MockHostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<HostRecord>) -> Self {
        let repo = Self::new();
        *repo.rows.lock().unwrap() = records;
        repo
    }

    /// Writes for this host_name fail with an internal error
    pub fn fail_writes_for(&self, host_name: &str) {
        self.failing_hosts.lock().unwrap().push(host_name.to_string());
    }

    pub fn records(&self) -> Vec<HostRecord> {
        self.rows.lock().unwrap().clone()
    }

    /// Number of successful inserts and updates
    pub fn write_count(&self) -> u32 {
        *self.writes.lock().unwrap()
    }

    fn check_failure(&self, record: &HostRecord) -> InventoryResult<()> {
        let failing = self.failing_hosts.lock().unwrap();
        if failing.iter().any(|name| name == key(&record.host_name)) {
            return Err(InventoryError::Internal(format!(
                "injected write failure for {}",
                key(&record.host_name)
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl HostRepository for MockHostRepository {
    async fn find_by_host_and_external_ip(
        &self,
        host_name: Option<&str>,
        external_ip: Option<&str>,
    ) -> InventoryResult<Option<HostRecord>> {
        let host_name = host_name.unwrap_or("");
        let external_ip = external_ip.filter(|v| !v.is_empty());
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| key(&row.host_name) == host_name && nullable(&row.external_ip) == external_ip)
            .cloned())
    }

    async fn insert(&self, record: &HostRecord) -> InventoryResult<()> {
        self.check_failure(record)?;
        let mut rows = self.rows.lock().unwrap();
        let duplicate = rows.iter().any(|row| {
            key(&row.host_name) == key(&record.host_name)
                && key(&row.internal_ip) == key(&record.internal_ip)
        });
        if duplicate {
            return Err(InventoryError::Internal(format!(
                "duplicate host identity: {}",
                record.describe()
            )));
        }
        rows.push(record.clone());
        *self.writes.lock().unwrap() += 1;
        Ok(())
    }

    async fn update_by_host_name(&self, record: &HostRecord) -> InventoryResult<bool> {
        self.check_failure(record)?;
        let mut rows = self.rows.lock().unwrap();
        match rows
            .iter_mut()
            .find(|row| key(&row.host_name) == key(&record.host_name))
        {
            Some(row) => {
                *row = record.clone();
                *self.writes.lock().unwrap() += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> InventoryResult<i64> {
        Ok(self.rows.lock().unwrap().len() as i64)
    }

    async fn list(&self) -> InventoryResult<Vec<HostRecord>> {
        Ok(self.records())
    }
}

/// Mock implementation of SourceClient with scripted pages
///
/// Pages without a scripted body return an empty array. Scripted failures
/// for a page are returned first, one per call.
#[derive(Debug, Clone, Default)]
pub struct MockSourceClient {
    pages: Arc<Mutex<HashMap<(String, u32), Value>>>,
    failures: Arc<Mutex<HashMap<(String, u32), VecDeque<InventoryError>>>>,
    calls: Arc<Mutex<Vec<WorkItem>>>,
    delay: Option<Duration>,
}

impl MockSourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_page(&self, endpoint: &str, page_offset: u32, body: Value) {
        self.pages
            .lock()
            .unwrap()
            .insert((endpoint.to_string(), page_offset), body);
    }

    pub fn push_failure(&self, endpoint: &str, page_offset: u32, error: InventoryError) {
        self.failures
            .lock()
            .unwrap()
            .entry((endpoint.to_string(), page_offset))
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<WorkItem> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SourceClient for MockSourceClient {
    async fn fetch_page(&self, item: &WorkItem) -> InventoryResult<Value> {
        self.calls.lock().unwrap().push(item.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let page = (item.endpoint.clone(), item.page_offset);
        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&page)
            .and_then(VecDeque::pop_front);
        if let Some(error) = failure {
            return Err(error);
        }

        Ok(self
            .pages
            .lock()
            .unwrap()
            .get(&page)
            .cloned()
            .unwrap_or_else(|| json!([])))
    }
}
