// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Incident Store
//!
//! Serves past-incident records to the Historical Evaluator. Two rankers are
//! available for full-text lookup over `title + summary + tags`:
//!
//! - **Keyword** — count of query terms present in the document
//! - **BM25** — Okapi BM25 (k1 = 1.2, b = 0.75)
//!
//! The ranker only decides *which* incidents come back and in what order;
//! the Historical Evaluator computes its own similarity over whatever is
//! returned, so the SRI score is independent of the back-end ranking.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::domain::error::{ConfigError, StoreError};
use crate::domain::incident::Incident;

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

/// Full-text lookup request.
#[derive(Debug, Clone)]
pub struct IncidentQuery {
    pub text: String,
    pub limit: usize,
}

impl IncidentQuery {
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            limit,
        }
    }
}

/// Ranking back-end for incident lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncidentRanking {
    #[default]
    Keyword,
    Bm25,
}

/// Serves past-incident records.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Incidents relevant to the query, best match first.
    ///
    /// An empty query returns every incident (up to `limit`).
    async fn lookup(&self, query: &IncidentQuery) -> Result<Vec<Incident>, StoreError>;
}

/// File-backed incident store (mock mode).
pub struct JsonIncidentStore {
    path: PathBuf,
    ranking: IncidentRanking,
    current: RwLock<Arc<Vec<Incident>>>,
}

impl JsonIncidentStore {
    pub fn load(path: impl AsRef<Path>, ranking: IncidentRanking) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let incidents = Self::read_incidents(&path)?;
        info!(
            incidents = incidents.len(),
            path = %path.display(),
            ?ranking,
            "incident store loaded"
        );
        Ok(Self {
            path,
            ranking,
            current: RwLock::new(Arc::new(incidents)),
        })
    }

    pub fn from_incidents(incidents: Vec<Incident>, ranking: IncidentRanking) -> Self {
        Self {
            path: PathBuf::new(),
            ranking,
            current: RwLock::new(Arc::new(incidents)),
        }
    }

    pub fn reload(&self) -> Result<(), ConfigError> {
        let incidents = Self::read_incidents(&self.path)?;
        *self.current.write() = Arc::new(incidents);
        Ok(())
    }

    fn read_incidents(path: &Path) -> Result<Vec<Incident>, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::DataFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| ConfigError::DataFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl IncidentStore for JsonIncidentStore {
    async fn lookup(&self, query: &IncidentQuery) -> Result<Vec<Incident>, StoreError> {
        let incidents = self.current.read().clone();
        let terms = tokenize(&query.text);
        if terms.is_empty() {
            return Ok(incidents.iter().take(query.limit).cloned().collect());
        }

        let scores: Vec<f64> = match self.ranking {
            IncidentRanking::Keyword => keyword_scores(&incidents, &terms),
            IncidentRanking::Bm25 => bm25_scores(&incidents, &terms),
        };

        let mut ranked: Vec<(usize, f64)> = scores
            .into_iter()
            .enumerate()
            .filter(|(_, s)| *s > 0.0)
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| incidents[a.0].incident_id.cmp(&incidents[b.0].incident_id))
        });

        Ok(ranked
            .into_iter()
            .take(query.limit)
            .map(|(i, _)| incidents[i].clone())
            .collect())
    }
}

fn document_text(incident: &Incident) -> String {
    let mut text = format!(
        "{} {} {} {}",
        incident.title, incident.summary, incident.action_type, incident.resource_type
    );
    if let Some(name) = &incident.resource_name {
        text.push(' ');
        text.push_str(name);
    }
    for tag in &incident.tags {
        text.push(' ');
        text.push_str(tag);
    }
    text
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn keyword_scores(incidents: &[Incident], terms: &[String]) -> Vec<f64> {
    incidents
        .iter()
        .map(|incident| {
            let doc: std::collections::HashSet<String> =
                tokenize(&document_text(incident)).into_iter().collect();
            terms.iter().filter(|t| doc.contains(*t)).count() as f64
        })
        .collect()
}

fn bm25_scores(incidents: &[Incident], terms: &[String]) -> Vec<f64> {
    let docs: Vec<Vec<String>> = incidents
        .iter()
        .map(|i| tokenize(&document_text(i)))
        .collect();
    let n = docs.len() as f64;
    if n == 0.0 {
        return vec![];
    }
    let avg_len = docs.iter().map(|d| d.len() as f64).sum::<f64>() / n;

    // Document frequency per query term.
    let mut df: HashMap<&str, f64> = HashMap::new();
    for term in terms {
        let count = docs
            .iter()
            .filter(|doc| doc.iter().any(|t| t == term))
            .count() as f64;
        df.insert(term.as_str(), count);
    }

    docs.iter()
        .map(|doc| {
            let doc_len = doc.len() as f64;
            terms
                .iter()
                .map(|term| {
                    let tf = doc.iter().filter(|t| t.as_str() == term.as_str()).count() as f64;
                    if tf == 0.0 {
                        return 0.0;
                    }
                    let dfi = df[term.as_str()];
                    let idf = ((n - dfi + 0.5) / (dfi + 0.5) + 1.0).ln();
                    idf * (tf * (BM25_K1 + 1.0))
                        / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * doc_len / avg_len.max(1.0)))
                })
                .sum()
        })
        .collect()
}
