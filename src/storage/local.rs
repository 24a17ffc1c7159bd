//! Local filesystem storage implementation.
//!
//! For development, CLI runs and tests. Production deployments should use
//! `DynamoStore`.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── regions/
//! │   ├── us-east-1.json       # Vec<ModelRecord>
//! │   └── ap-northeast-1.json
//! └── claims/
//!     └── us-east-1.json       # model id → claim expiry
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::ModelRecord;
use crate::storage::StateStore;

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    fn region_key(region: &str) -> String {
        format!("regions/{region}.json")
    }

    fn claims_key(region: &str) -> String {
        format!("claims/{region}.json")
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn read_records(&self, region: &str) -> Result<Vec<ModelRecord>> {
        Ok(self
            .read_json(&Self::region_key(region))
            .await?
            .unwrap_or_default())
    }

    async fn read_claims(&self, region: &str) -> Result<HashMap<String, DateTime<Utc>>> {
        Ok(self
            .read_json(&Self::claims_key(region))
            .await?
            .unwrap_or_default())
    }
}

#[async_trait]
impl StateStore for LocalStore {
    async fn records_for_region(&self, region: &str) -> Result<HashMap<String, ModelRecord>> {
        let records = self.read_records(region).await?;
        Ok(records
            .into_iter()
            .map(|r| (r.model_id.clone(), r))
            .collect())
    }

    async fn upsert_record(&self, record: &ModelRecord) -> Result<()> {
        let mut records = self.read_records(&record.region).await?;

        match records.iter_mut().find(|r| r.model_id == record.model_id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        records.sort_by(|a, b| a.model_id.cmp(&b.model_id));

        self.write_json(&Self::region_key(&record.region), &records)
            .await
    }

    async fn try_claim_dispatch(
        &self,
        model_id: &str,
        region: &str,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<bool> {
        let mut claims = self.read_claims(region).await?;

        if let Some(until) = claims.get(model_id) {
            if *until > now {
                return Ok(false);
            }
        }

        let until = now
            + chrono::Duration::from_std(lease)
                .map_err(|e| AppError::persistence(format!("lease out of range: {e}")))?;
        claims.insert(model_id.to_string(), until);
        self.write_json(&Self::claims_key(region), &claims).await?;
        Ok(true)
    }

    async fn release_dispatch_claim(&self, model_id: &str, region: &str) -> Result<()> {
        let mut claims = self.read_claims(region).await?;
        if claims.remove(model_id).is_some() {
            self.write_json(&Self::claims_key(region), &claims).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn record(model_id: &str, region: &str) -> ModelRecord {
        ModelRecord::discovered(model_id, region, ts(100))
    }

    #[tokio::test]
    async fn missing_region_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        let records = store.records_for_region("us-east-1").await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn upsert_then_read_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store.upsert_record(&record("m1", "us-east-1")).await.unwrap();
        store.upsert_record(&record("m2", "us-east-1")).await.unwrap();

        let records = store.records_for_region("us-east-1").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records["m1"].region, "us-east-1");
    }

    #[tokio::test]
    async fn upsert_is_idempotent_and_replaces() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        let mut r = record("m1", "us-east-1");
        store.upsert_record(&r).await.unwrap();
        store.upsert_record(&r).await.unwrap();

        r.refresh(ts(200));
        r.mark_notified();
        store.upsert_record(&r).await.unwrap();

        let records = store.records_for_region("us-east-1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(records["m1"].notified);
        assert_eq!(records["m1"].last_seen_at, ts(200));
        assert_eq!(records["m1"].first_seen_at, ts(100));
    }

    #[tokio::test]
    async fn regions_are_isolated() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store.upsert_record(&record("m1", "us-east-1")).await.unwrap();
        store.upsert_record(&record("m1", "us-west-2")).await.unwrap();

        assert_eq!(store.records_for_region("us-east-1").await.unwrap().len(), 1);
        assert_eq!(store.records_for_region("us-west-2").await.unwrap().len(), 1);
        assert!(store.records_for_region("eu-west-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn claim_granted_then_denied_until_expiry() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let lease = Duration::from_secs(120);

        assert!(store
            .try_claim_dispatch("m1", "us-east-1", ts(100), lease)
            .await
            .unwrap());

        // A concurrent tick inside the lease window is denied
        assert!(!store
            .try_claim_dispatch("m1", "us-east-1", ts(150), lease)
            .await
            .unwrap());

        // After expiry the claim can be taken again
        assert!(store
            .try_claim_dispatch("m1", "us-east-1", ts(221), lease)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn claims_are_per_model() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let lease = Duration::from_secs(120);

        assert!(store
            .try_claim_dispatch("m1", "us-east-1", ts(100), lease)
            .await
            .unwrap());
        assert!(store
            .try_claim_dispatch("m2", "us-east-1", ts(100), lease)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn released_claim_can_be_retaken() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let lease = Duration::from_secs(120);

        assert!(store
            .try_claim_dispatch("m1", "us-east-1", ts(100), lease)
            .await
            .unwrap());
        store.release_dispatch_claim("m1", "us-east-1").await.unwrap();
        assert!(store
            .try_claim_dispatch("m1", "us-east-1", ts(110), lease)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn claim_survives_record_upsert() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        let lease = Duration::from_secs(120);

        assert!(store
            .try_claim_dispatch("m1", "us-east-1", ts(100), lease)
            .await
            .unwrap());
        store.upsert_record(&record("m1", "us-east-1")).await.unwrap();

        assert!(!store
            .try_claim_dispatch("m1", "us-east-1", ts(110), lease)
            .await
            .unwrap());
    }
}
