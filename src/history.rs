//! Version History
//!
//! Per-document ordered sequence of [`EnhancementVersion`]s with a "current
//! index" pointer, bounded by `max_versions_per_document`. Version ids are
//! monotonic across the whole store, not just within one document, so a
//! cross-document comparison is never ambiguous.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::hashutil::sha256_hex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementVersion {
    pub version_id: u64,
    pub content: String,
    pub content_hash: String,
    pub quality_score: f64,
    pub created_at: DateTime<Utc>,
    pub parent_version_id: Option<u64>,
    pub strategy_applied: Option<String>,
    pub changes_summary: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

fn hash_content(content: &str) -> String {
    sha256_hex(content.as_bytes())
}

/// Line-level diff summary between two versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionComparison {
    pub from_version_id: u64,
    pub to_version_id: u64,
    pub similarity_ratio: f64,
    pub quality_delta: f64,
    pub added_lines: usize,
    pub removed_lines: usize,
    pub strategies_applied: Vec<String>,
}

pub enum RollbackTarget {
    Previous,
    Specific(u64),
}

#[derive(Debug)]
struct DocumentHistory {
    versions: Vec<EnhancementVersion>,
    current_index: usize,
}

/// Owns one [`DocumentHistory`] per document id behind a single lock; the
/// pipeline serializes enhancements of the same document, so contention here
/// is only ever cross-document.
pub struct VersionHistory {
    next_version_id: AtomicU64,
    max_versions_per_document: usize,
    documents: RwLock<HashMap<String, DocumentHistory>>,
}

impl VersionHistory {
    pub fn new(max_versions_per_document: usize) -> Arc<Self> {
        Arc::new(Self {
            next_version_id: AtomicU64::new(1),
            max_versions_per_document,
            documents: RwLock::new(HashMap::new()),
        })
    }

    fn allocate_version_id(&self) -> u64 {
        self.next_version_id.fetch_add(1, Ordering::AcqRel)
    }

    /// Append a new version for `document_id`, returning it.
    pub fn add_version(
        &self,
        document_id: &str,
        content: &str,
        quality_score: f64,
        strategy_applied: Option<String>,
        changes_summary: impl Into<String>,
    ) -> EnhancementVersion {
        let version_id = self.allocate_version_id();
        let mut documents = self.documents.write().unwrap_or_else(|p| p.into_inner());
        let entry = documents
            .entry(document_id.to_string())
            .or_insert_with(|| DocumentHistory {
                versions: Vec::new(),
                current_index: 0,
            });

        let parent_version_id = entry.versions.last().map(|v| v.version_id);

        let version = EnhancementVersion {
            version_id,
            content: content.to_string(),
            content_hash: hash_content(content),
            quality_score,
            created_at: Utc::now(),
            parent_version_id,
            strategy_applied,
            changes_summary: changes_summary.into(),
            metadata: HashMap::new(),
        };

        entry.versions.push(version.clone());
        entry.current_index = entry.versions.len() - 1;

        if entry.versions.len() > self.max_versions_per_document {
            entry.versions.remove(0);
            entry.current_index = entry.current_index.saturating_sub(1);
        }

        version
    }

    pub fn current(&self, document_id: &str) -> Option<EnhancementVersion> {
        let documents = self.documents.read().unwrap_or_else(|p| p.into_inner());
        documents
            .get(document_id)
            .and_then(|h| h.versions.get(h.current_index).cloned())
    }

    pub fn all_versions(&self, document_id: &str) -> Vec<EnhancementVersion> {
        let documents = self.documents.read().unwrap_or_else(|p| p.into_inner());
        documents.get(document_id).map(|h| h.versions.clone()).unwrap_or_default()
    }

    /// Without a target, append a new version carrying the previous
    /// version's content (tagged `"rollback"`). With a target, move the
    /// current-index pointer without appending; a non-existent target
    /// leaves state unchanged and returns `None`.
    pub fn rollback(&self, document_id: &str, target: RollbackTarget) -> Option<EnhancementVersion> {
        match target {
            RollbackTarget::Previous => {
                let mut documents = self.documents.write().unwrap_or_else(|p| p.into_inner());
                let history = documents.get_mut(document_id)?;
                if history.versions.len() < 2 {
                    return None;
                }
                let previous = history.versions[history.versions.len() - 2].clone();
                drop(documents);

                Some(self.add_version(
                    document_id,
                    &previous.content,
                    previous.quality_score,
                    Some("rollback".to_string()),
                    format!("rolled back to version {}", previous.version_id),
                ))
            }
            RollbackTarget::Specific(target_id) => {
                let mut documents = self.documents.write().unwrap_or_else(|p| p.into_inner());
                let history = documents.get_mut(document_id)?;
                let index = history.versions.iter().position(|v| v.version_id == target_id)?;
                history.current_index = index;
                history.versions.get(index).cloned()
            }
        }
    }

    pub fn compare(&self, document_id: &str, from_id: u64, to_id: u64) -> Option<VersionComparison> {
        let versions = self.all_versions(document_id);
        let from = versions.iter().find(|v| v.version_id == from_id)?;
        let to = versions.iter().find(|v| v.version_id == to_id)?;

        let (added_lines, removed_lines, similarity_ratio) = line_diff(&from.content, &to.content);

        let strategies_applied = versions
            .iter()
            .filter(|v| v.version_id > from_id.min(to_id) && v.version_id <= from_id.max(to_id))
            .filter_map(|v| v.strategy_applied.clone())
            .collect();

        Some(VersionComparison {
            from_version_id: from_id,
            to_version_id: to_id,
            similarity_ratio,
            quality_delta: to.quality_score - from.quality_score,
            added_lines,
            removed_lines,
            strategies_applied,
        })
    }
}

/// Very small line-level diff: counts lines present only in `to` as added,
/// lines present only in `from` as removed, and derives a similarity ratio
/// from the size of the common subset.
fn line_diff(from: &str, to: &str) -> (usize, usize, f64) {
    let from_lines: Vec<&str> = from.lines().collect();
    let to_lines: Vec<&str> = to.lines().collect();

    let from_set: std::collections::HashSet<&str> = from_lines.iter().copied().collect();
    let to_set: std::collections::HashSet<&str> = to_lines.iter().copied().collect();

    let common = from_set.intersection(&to_set).count();
    let added = to_set.difference(&from_set).count();
    let removed = from_set.difference(&to_set).count();

    let union = from_set.union(&to_set).count().max(1);
    let similarity_ratio = common as f64 / union as f64;

    (added, removed, similarity_ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ids_are_strictly_increasing() {
        let history = VersionHistory::new(50);
        let v1 = history.add_version("doc-1", "a", 0.5, None, "seed");
        let v2 = history.add_version("doc-1", "b", 0.6, Some("clarity".into()), "improved");
        assert!(v2.version_id > v1.version_id);
        assert_eq!(v2.parent_version_id, Some(v1.version_id));
    }

    #[test]
    fn content_hash_equal_iff_content_equal() {
        let history = VersionHistory::new(50);
        let v1 = history.add_version("doc-1", "same", 0.5, None, "seed");
        let v2 = history.add_version("doc-1", "same", 0.5, None, "no-op");
        let v3 = history.add_version("doc-1", "different", 0.5, None, "changed");
        assert_eq!(v1.content_hash, v2.content_hash);
        assert_ne!(v1.content_hash, v3.content_hash);
    }

    #[test]
    fn cap_enforcement_drops_oldest() {
        let history = VersionHistory::new(2);
        history.add_version("doc-1", "a", 0.1, None, "1");
        history.add_version("doc-1", "b", 0.2, None, "2");
        history.add_version("doc-1", "c", 0.3, None, "3");
        let versions = history.all_versions("doc-1");
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].content, "b");
    }

    #[test]
    fn rollback_idempotence() {
        let history = VersionHistory::new(50);
        let v1 = history.add_version("doc-1", "a", 0.1, None, "1");
        history.add_version("doc-1", "b", 0.2, None, "2");

        let rolled_back_once = history.rollback("doc-1", RollbackTarget::Specific(v1.version_id)).unwrap();
        let rolled_back_twice = history.rollback("doc-1", RollbackTarget::Specific(v1.version_id)).unwrap();
        assert_eq!(rolled_back_once.content_hash, rolled_back_twice.content_hash);
    }

    #[test]
    fn rollback_to_missing_target_leaves_state_unchanged() {
        let history = VersionHistory::new(50);
        history.add_version("doc-1", "a", 0.1, None, "1");
        assert!(history.rollback("doc-1", RollbackTarget::Specific(9999)).is_none());
        assert_eq!(history.all_versions("doc-1").len(), 1);
    }

    #[test]
    fn compare_reports_quality_delta_and_strategies() {
        let history = VersionHistory::new(50);
        let v1 = history.add_version("doc-1", "line one", 0.4, None, "seed");
        let v2 = history.add_version("doc-1", "line one\nline two", 0.6, Some("completeness".into()), "expanded");
        let comparison = history.compare("doc-1", v1.version_id, v2.version_id).unwrap();
        assert!((comparison.quality_delta - 0.2).abs() < 1e-9);
        assert_eq!(comparison.added_lines, 1);
        assert_eq!(comparison.strategies_applied, vec!["completeness".to_string()]);
    }
}
