// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::domain::agent::AgentRecord;
use crate::domain::error::PersistenceError;
use crate::domain::repository::AgentRegistry;
use crate::domain::verdict::Decision;

/// Mock-mode registry: one JSON file per agent name.
///
/// A single mutex serializes read-modify-write cycles so concurrent verdicts
/// for the same agent cannot drop counter updates.
pub struct FileAgentRegistry {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAgentRegistry {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn path_for(&self, name: &str) -> PathBuf {
        // Agent names are free-form; keep the file name filesystem-safe.
        let safe: String = name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    fn load(&self, name: &str) -> Result<Option<AgentRecord>, PersistenceError> {
        let path = self.path_for(name);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, record: &AgentRecord) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(self.path_for(&record.name), json)?;
        Ok(())
    }
}

#[async_trait]
impl AgentRegistry for FileAgentRegistry {
    async fn register(
        &self,
        name: &str,
        card_url: Option<&str>,
    ) -> Result<AgentRecord, PersistenceError> {
        let _guard = self.write_lock.lock();
        let record = match self.load(name)? {
            Some(mut existing) => {
                // Re-registration refreshes presence, never the counters.
                existing.last_seen = Utc::now();
                if let Some(url) = card_url {
                    existing.card_url = Some(url.to_string());
                }
                existing
            }
            None => AgentRecord::new(name, card_url.map(str::to_string)),
        };
        self.save(&record)?;
        Ok(record)
    }

    async fn update_stats(
        &self,
        name: &str,
        decision: Decision,
        seen_at: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock();
        let mut record = self.load(name)?.unwrap_or_else(|| {
            let mut record = AgentRecord::new(name, None);
            record.registered_at = seen_at;
            record.last_seen = seen_at;
            record
        });
        record.apply_decision(decision, seen_at);
        self.save(&record)
    }

    async fn get(&self, name: &str) -> Result<Option<AgentRecord>, PersistenceError> {
        self.load(name)
    }

    async fn list(&self) -> Result<Vec<AgentRecord>, PersistenceError> {
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path)
                .map_err(PersistenceError::from)
                .and_then(|raw| serde_json::from_str(&raw).map_err(PersistenceError::from))
            {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable agent record"),
            }
        }
        records.sort_by(|a: &AgentRecord, b: &AgentRecord| b.last_seen.cmp(&a.last_seen));
        Ok(records)
    }
}
