//! Saved results keyed by owner and file name

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Everything kept about one uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedResult {
    pub owner: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
    /// Empty when no target was ever inferred
    pub inferred_target: String,
    /// e.g. "120 rows, 4 columns"
    pub data_shape: String,
    pub eda_result: Value,
    pub model_result: Value,
    pub model_name: String,
    pub notes: String,
}

impl SavedResult {
    fn new(owner: &str, file_name: &str, data_shape: &str) -> Self {
        Self {
            owner: owner.to_string(),
            file_name: file_name.to_string(),
            uploaded_at: Utc::now(),
            inferred_target: String::new(),
            data_shape: data_shape.to_string(),
            eda_result: Value::Object(Default::default()),
            model_result: Value::Object(Default::default()),
            model_name: String::new(),
            notes: String::new(),
        }
    }

    fn set_target(&mut self, target: Option<&str>) {
        if let Some(target) = target.filter(|t| !t.is_empty()) {
            self.inferred_target = target.to_string();
        }
    }
}

/// Upsert-style record store. Saving again for the same (owner, file)
/// overwrites the payload but keeps a previously inferred target when the
/// new one is empty.
pub trait ResultStore: Send + Sync {
    fn save_eda(&self, owner: &str, file_name: &str, eda: Value, target: Option<&str>, data_shape: &str) -> SavedResult;

    fn save_model(
        &self,
        owner: &str,
        file_name: &str,
        result: Value,
        model_name: &str,
        target: Option<&str>,
        data_shape: &str,
    ) -> SavedResult;

    fn get(&self, owner: &str, file_name: &str) -> Option<SavedResult>;

    /// Newest upload first
    fn list(&self, owner: &str) -> Vec<SavedResult>;

    fn delete(&self, owner: &str, file_name: &str) -> bool;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    records: RwLock<HashMap<(String, String), SavedResult>>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn upsert<F>(&self, owner: &str, file_name: &str, data_shape: &str, update: F) -> SavedResult
    where
        F: FnOnce(&mut SavedResult),
    {
        let mut records = self.records.write();
        let record = records
            .entry((owner.to_string(), file_name.to_string()))
            .or_insert_with(|| {
                debug!(owner, file_name, "Creating saved result");
                SavedResult::new(owner, file_name, data_shape)
            });
        record.data_shape = data_shape.to_string();
        update(record);
        record.clone()
    }
}

impl ResultStore for InMemoryResultStore {
    fn save_eda(&self, owner: &str, file_name: &str, eda: Value, target: Option<&str>, data_shape: &str) -> SavedResult {
        self.upsert(owner, file_name, data_shape, |record| {
            record.eda_result = eda;
            record.set_target(target);
        })
    }

    fn save_model(
        &self,
        owner: &str,
        file_name: &str,
        result: Value,
        model_name: &str,
        target: Option<&str>,
        data_shape: &str,
    ) -> SavedResult {
        self.upsert(owner, file_name, data_shape, |record| {
            record.model_result = result;
            record.model_name = model_name.to_string();
            record.set_target(target);
        })
    }

    fn get(&self, owner: &str, file_name: &str) -> Option<SavedResult> {
        self.records.read().get(&(owner.to_string(), file_name.to_string())).cloned()
    }

    fn list(&self, owner: &str) -> Vec<SavedResult> {
        let mut results: Vec<SavedResult> = self
            .records
            .read()
            .values()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then_with(|| a.file_name.cmp(&b.file_name)));
        results
    }

    fn delete(&self, owner: &str, file_name: &str) -> bool {
        self.records.write().remove(&(owner.to_string(), file_name.to_string())).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_keeps_previous_target() {
        let store = InMemoryResultStore::new();
        store.save_eda("ana", "shop.csv", json!({"shape": [3, 2]}), Some("revenue"), "3 rows, 2 columns");
        let saved = store.save_model("ana", "shop.csv", json!({"rmse": 1.0}), "xgboost", None, "3 rows, 2 columns");

        assert_eq!(store.len(), 1);
        assert_eq!(saved.inferred_target, "revenue");
        assert_eq!(saved.model_name, "xgboost");
        assert_eq!(saved.eda_result["shape"], json!([3, 2]));
        assert_eq!(saved.model_result["rmse"], 1.0);
    }

    #[test]
    fn test_new_model_overwrites() {
        let store = InMemoryResultStore::new();
        store.save_model("ana", "a.csv", json!({"rmse": 2.0}), "linear_regression", Some("sales"), "1 rows, 2 columns");
        store.save_model("ana", "a.csv", json!({"rmse": 1.0}), "decision_tree", Some("profit"), "1 rows, 2 columns");

        let saved = store.get("ana", "a.csv").unwrap();
        assert_eq!(saved.model_name, "decision_tree");
        assert_eq!(saved.inferred_target, "profit");
    }

    #[test]
    fn test_owners_are_isolated() {
        let store = InMemoryResultStore::new();
        store.save_eda("ana", "a.csv", json!({}), None, "1 rows, 1 columns");
        store.save_eda("ben", "a.csv", json!({}), None, "1 rows, 1 columns");

        assert_eq!(store.list("ana").len(), 1);
        assert!(store.delete("ben", "a.csv"));
        assert!(store.get("ben", "a.csv").is_none());
        assert!(store.get("ana", "a.csv").is_some());
        assert_eq!(store.get("ana", "a.csv").unwrap().inferred_target, "");
    }
}
