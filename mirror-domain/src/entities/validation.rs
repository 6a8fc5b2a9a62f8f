// Validation report entities

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value_objects::{ContainerId, EventId};

/// Variant order is the tie-breaker in report ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    MissingFile,
    PartialEvent,
    InvalidJson,
    MissingField,
    ThresholdExceeded,
    OrphanedReference,
    IdCollision,
    PathCollision,
    PlacementGap,
    PlacementDuplicate,
    SeedDuplicate,
    DanglingIndexRef,
    UnindexedEvent,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::MissingFile => "missing-file",
            IssueKind::PartialEvent => "partial-event",
            IssueKind::InvalidJson => "invalid-json",
            IssueKind::MissingField => "missing-field",
            IssueKind::ThresholdExceeded => "threshold-exceeded",
            IssueKind::OrphanedReference => "orphaned-reference",
            IssueKind::IdCollision => "id-collision",
            IssueKind::PathCollision => "path-collision",
            IssueKind::PlacementGap => "placement-gap",
            IssueKind::PlacementDuplicate => "placement-duplicate",
            IssueKind::SeedDuplicate => "seed-duplicate",
            IssueKind::DanglingIndexRef => "dangling-index-ref",
            IssueKind::UnindexedEvent => "unindexed-event",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Issue {
    pub container_id: Option<ContainerId>,
    pub event_id: Option<EventId>,
    pub kind: IssueKind,
    pub path: String,
    pub detail: String,
}

impl Issue {
    pub fn new(kind: IssueKind, path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            container_id: None,
            event_id: None,
            kind,
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn container(mut self, container_id: Option<ContainerId>) -> Self {
        self.container_id = container_id;
        self
    }

    pub fn event(mut self, event_id: Option<EventId>) -> Self {
        self.event_id = event_id;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub events_checked: usize,
    pub containers_checked: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
    pub summary: ValidationSummary,
}

impl ValidationReport {
    /// Sorts issues (container, event, kind, path, detail) and fills the summary.
    pub fn finalize(
        mut issues: Vec<Issue>,
        events_checked: usize,
        containers_checked: usize,
        max_integrity_issues: usize,
    ) -> Self {
        issues.sort();
        issues.dedup();
        let mut by_kind = BTreeMap::new();
        for issue in &issues {
            *by_kind.entry(issue.kind.as_str().to_string()).or_insert(0) += 1;
        }
        let total = issues.len();
        Self {
            issues,
            summary: ValidationSummary {
                total,
                by_kind,
                events_checked,
                containers_checked,
                passed: total <= max_integrity_issues,
            },
        }
    }
}
