//! Assessment repository

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use emotion_sampler::Emotion;
use risk_engine::{AssessmentResult, ResponseSet, RiskLevel};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::KeyValueStore;
use crate::StorageError;

const KEY_PREFIX: &str = "assessment/";

/// Stored assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub user_id: String,
    /// Question id to raw answer
    pub responses: BTreeMap<String, u8>,
    /// Primary emotion probability, 0 without an estimate
    pub emotion_score: f64,
    pub emotion_type: Option<Emotion>,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl AssessmentRecord {
    pub fn from_result(user_id: impl Into<String>, responses: &ResponseSet, result: &AssessmentResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            responses: responses.to_values(),
            emotion_score: result.emotion.as_ref().map_or(0.0, |e| e.score),
            emotion_type: result.emotion.as_ref().map(|e| e.primary),
            risk_level: result.risk_level,
            risk_score: result.risk_score,
            recommendations: result.recommendations(),
            timestamp: result.created_at,
        }
    }

    /// Combined well-being score the risk score was derived from
    pub fn overall_score(&self) -> f64 {
        1.0 - self.risk_score
    }
}

/// Change notification
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryEvent {
    Saved { id: Uuid, user_id: String },
    Deleted { id: Uuid },
}

/// Assessment records on top of a key/value store
pub struct AssessmentRepository<S: KeyValueStore> {
    store: S,
    events: broadcast::Sender<RepositoryEvent>,
}

impl<S: KeyValueStore> AssessmentRepository<S> {
    pub fn new(store: S) -> Self {
        info!("Creating assessment repository");
        let (events, _) = broadcast::channel(64);
        Self { store, events }
    }

    /// Receive every save and delete made after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.events.subscribe()
    }

    pub fn save(&self, record: &AssessmentRecord) -> Result<Uuid, StorageError> {
        self.store.put(&key(&record.id), serde_json::to_string(record)?)?;
        debug!("Saved assessment {} for {}", record.id, record.user_id);

        // No subscribers is fine
        let _ = self.events.send(RepositoryEvent::Saved {
            id: record.id,
            user_id: record.user_id.clone(),
        });
        Ok(record.id)
    }

    pub fn get(&self, id: &Uuid) -> Result<Option<AssessmentRecord>, StorageError> {
        match self.store.get(&key(id))? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Like `get`, but a missing record is an error
    pub fn require(&self, id: &Uuid) -> Result<AssessmentRecord, StorageError> {
        self.get(id)?.ok_or(StorageError::NotFound)
    }

    /// Every record, newest first
    pub fn list(&self) -> Result<Vec<AssessmentRecord>, StorageError> {
        let mut records = self
            .store
            .keys(KEY_PREFIX)?
            .iter()
            .filter_map(|k| self.store.get(k).transpose())
            .map(|raw| raw.and_then(|r| serde_json::from_str(&r).map_err(StorageError::from)))
            .collect::<Result<Vec<AssessmentRecord>, _>>()?;
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    /// One user's records, newest first
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<AssessmentRecord>, StorageError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect())
    }

    pub fn delete(&self, id: &Uuid) -> Result<bool, StorageError> {
        let existed = self.store.delete(&key(id))?;
        if existed {
            debug!("Deleted assessment {}", id);
            let _ = self.events.send(RepositoryEvent::Deleted { id: *id });
        }
        Ok(existed)
    }

    /// Returns how many of `ids` existed
    pub fn delete_many(&self, ids: &[Uuid]) -> Result<usize, StorageError> {
        let mut deleted = 0;
        for id in ids {
            if self.delete(id)? {
                deleted += 1;
            }
        }
        info!("Deleted {} of {} assessments", deleted, ids.len());
        Ok(deleted)
    }

    pub fn count(&self) -> Result<usize, StorageError> {
        Ok(self.store.keys(KEY_PREFIX)?.len())
    }
}

fn key(id: &Uuid) -> String {
    format!("{}{}", KEY_PREFIX, id)
}
