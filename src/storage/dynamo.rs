//! DynamoDB storage implementation.
//!
//! One item per (model id, region) composite key: partition key `model_id`,
//! sort key `region`. Record fields are written with `UpdateItem` so the
//! store-managed dispatch claim attribute survives a record upsert, and the
//! claim itself is a conditional write — two concurrent ticks converge
//! instead of double-dispatching.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, warn};

use crate::error::{AppError, Result};
use crate::models::{DetectorConfig, ModelRecord, RecordStatus};
use crate::storage::StateStore;

const ATTR_CLAIM: &str = "dispatch_claim_until";

/// DynamoDB-backed model record storage.
pub struct DynamoStore {
    client: Client,
    table: String,
}

impl DynamoStore {
    /// Create a new DynamoDB storage instance.
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Create storage from the default AWS environment.
    pub async fn from_config(config: &DetectorConfig) -> Self {
        let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(Client::new(&aws), config.table_name.clone())
    }

    fn key(model_id: &str, region: &str) -> [(&'static str, AttributeValue); 2] {
        [
            ("model_id", AttributeValue::S(model_id.to_string())),
            ("region", AttributeValue::S(region.to_string())),
        ]
    }
}

/// Fixed-width UTC timestamp so string comparison in condition expressions
/// orders correctly.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(field: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::persistence(format!("bad timestamp in {field}: {e}")))
}

fn string_attr(item: &HashMap<String, AttributeValue>, field: &str) -> Result<String> {
    item.get(field)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| AppError::persistence(format!("item missing string attribute {field}")))
}

fn record_from_item(item: &HashMap<String, AttributeValue>) -> Result<ModelRecord> {
    let status_raw = string_attr(item, "status")?;
    let status = RecordStatus::parse(&status_raw)
        .ok_or_else(|| AppError::persistence(format!("unknown record status '{status_raw}'")))?;

    Ok(ModelRecord {
        model_id: string_attr(item, "model_id")?,
        region: string_attr(item, "region")?,
        first_seen_at: parse_ts("first_seen_at", &string_attr(item, "first_seen_at")?)?,
        last_seen_at: parse_ts("last_seen_at", &string_attr(item, "last_seen_at")?)?,
        notified: item
            .get("notified")
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(false),
        status,
    })
}

#[async_trait]
impl StateStore for DynamoStore {
    async fn records_for_region(&self, region: &str) -> Result<HashMap<String, ModelRecord>> {
        // `region` and `status` are DynamoDB reserved words. Claim-only stub
        // items (created by a concurrent tick's conditional claim before its
        // record landed) carry no first_seen_at and are filtered out.
        let mut stream = self
            .client
            .scan()
            .table_name(&self.table)
            .filter_expression("#r = :region AND attribute_exists(first_seen_at)")
            .expression_attribute_names("#r", "region")
            .expression_attribute_values(":region", AttributeValue::S(region.to_string()))
            .into_paginator()
            .items()
            .send();

        let mut records = HashMap::new();
        while let Some(item) = stream.next().await {
            let item = item.map_err(|e| AppError::persistence(e.into_service_error()))?;
            let record = record_from_item(&item)?;
            records.insert(record.model_id.clone(), record);
        }

        info!("[{}] {} records loaded from {}", region, records.len(), self.table);
        Ok(records)
    }

    async fn upsert_record(&self, record: &ModelRecord) -> Result<()> {
        let [pk, sk] = Self::key(&record.model_id, &record.region);

        self.client
            .update_item()
            .table_name(&self.table)
            .key(pk.0, pk.1)
            .key(sk.0, sk.1)
            .update_expression(
                "SET first_seen_at = :first, last_seen_at = :last, notified = :notified, #s = :status",
            )
            .expression_attribute_names("#s", "status")
            .expression_attribute_values(":first", AttributeValue::S(format_ts(record.first_seen_at)))
            .expression_attribute_values(":last", AttributeValue::S(format_ts(record.last_seen_at)))
            .expression_attribute_values(":notified", AttributeValue::Bool(record.notified))
            .expression_attribute_values(":status", AttributeValue::S(record.status.as_str().to_string()))
            .send()
            .await
            .map_err(|e| AppError::persistence(e.into_service_error()))?;

        Ok(())
    }

    async fn try_claim_dispatch(
        &self,
        model_id: &str,
        region: &str,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> Result<bool> {
        let until = now
            + chrono::Duration::from_std(lease)
                .map_err(|e| AppError::persistence(format!("lease out of range: {e}")))?;
        let [pk, sk] = Self::key(model_id, region);

        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .key(pk.0, pk.1)
            .key(sk.0, sk.1)
            .update_expression("SET #claim = :until")
            .condition_expression("attribute_not_exists(#claim) OR #claim < :now")
            .expression_attribute_names("#claim", ATTR_CLAIM)
            .expression_attribute_values(":until", AttributeValue::S(format_ts(until)))
            .expression_attribute_values(":now", AttributeValue::S(format_ts(now)))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    warn!("[{}] dispatch claim for {} held elsewhere", region, model_id);
                    Ok(false)
                } else {
                    Err(AppError::persistence(service_err))
                }
            }
        }
    }

    async fn release_dispatch_claim(&self, model_id: &str, region: &str) -> Result<()> {
        let [pk, sk] = Self::key(model_id, region);

        self.client
            .update_item()
            .table_name(&self.table)
            .key(pk.0, pk.1)
            .key(sk.0, sk.1)
            .update_expression("REMOVE #claim")
            .expression_attribute_names("#claim", ATTR_CLAIM)
            .send()
            .await
            .map_err(|e| AppError::persistence(e.into_service_error()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn record_round_trips_through_item() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut record = ModelRecord::discovered("anthropic.claude-v3", "us-east-1", ts);
        record.mark_notified();

        let mut item = HashMap::new();
        item.insert("model_id".into(), AttributeValue::S(record.model_id.clone()));
        item.insert("region".into(), AttributeValue::S(record.region.clone()));
        item.insert(
            "first_seen_at".into(),
            AttributeValue::S(format_ts(record.first_seen_at)),
        );
        item.insert(
            "last_seen_at".into(),
            AttributeValue::S(format_ts(record.last_seen_at)),
        );
        item.insert("notified".into(), AttributeValue::Bool(record.notified));
        item.insert(
            "status".into(),
            AttributeValue::S(record.status.as_str().to_string()),
        );

        let parsed = record_from_item(&item).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn item_missing_status_is_rejected() {
        let mut item = HashMap::new();
        item.insert("model_id".into(), AttributeValue::S("m1".into()));
        item.insert("region".into(), AttributeValue::S("us-east-1".into()));
        assert!(record_from_item(&item).is_err());
    }

    #[test]
    fn formatted_timestamps_order_lexicographically() {
        let early = Utc.timestamp_opt(1_700_000_000, 1_000).unwrap();
        let late = Utc.timestamp_opt(1_700_000_001, 0).unwrap();
        assert!(format_ts(early) < format_ts(late));
    }
}
