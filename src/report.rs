//! JSON run reports.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use convergence::{NodeFacts, ResourceOutcome, RunSummary};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
pub struct Counts {
    pub total: usize,
    pub updated: usize,
    pub up_to_date: usize,
    pub bypassed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub assumptions: usize,
}

/// Everything one `apply` did.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub why_run: bool,
    pub success: bool,
    pub node: NodeFacts,
    pub counts: Counts,
    pub resources: Vec<ResourceOutcome>,
}

impl RunReport {
    pub fn new(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        why_run: bool,
        node: &NodeFacts,
        summary: &RunSummary,
    ) -> Self {
        Self {
            started_at,
            finished_at,
            why_run,
            success: summary.is_success(),
            node: node.clone(),
            counts: Counts {
                total: summary.total(),
                updated: summary.updated,
                up_to_date: summary.up_to_date,
                bypassed: summary.bypassed,
                skipped: summary.skipped,
                failed: summary.failed,
                assumptions: summary.assumptions,
            },
            resources: summary.outcomes.clone(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content + "\n")
            .with_context(|| format!("Could not write report to {}", path.display()))?;
        log::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use convergence::{ActionStatus, ErrorKind, ResourceFailure};
    use tempfile::TempDir;

    fn summary() -> RunSummary {
        let mut summary = RunSummary::default();
        summary.add_outcome(ResourceOutcome {
            resource: "group[wheel]".to_string(),
            action: "create".to_string(),
            provider: Some("group::gpasswd".to_string()),
            status: ActionStatus::Updated,
            descriptions: vec!["create group wheel".to_string()],
            assumptions: vec![],
            error: None,
        });
        summary.add_outcome(ResourceOutcome {
            resource: "mount[/data]".to_string(),
            action: "mount".to_string(),
            provider: None,
            status: ActionStatus::Failed,
            descriptions: vec![],
            assumptions: vec![],
            error: Some(ResourceFailure {
                kind: ErrorKind::Configuration,
                message: "no provider for mount".to_string(),
            }),
        });
        summary
    }

    #[test]
    fn test_report_json_shape() {
        let start = Utc::now();
        let node = NodeFacts::new("ubuntu", "debian", "linux", "24.04");
        let report = RunReport::new(start, start, true, &node, &summary());

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["why_run"], true);
        assert_eq!(json["success"], false);
        assert_eq!(json["node"]["platform_family"], "debian");
        assert_eq!(json["counts"]["total"], 2);
        assert_eq!(json["counts"]["failed"], 1);
        assert_eq!(json["resources"][0]["status"], "updated");
        assert_eq!(json["resources"][1]["error"]["message"], "no provider for mount");
        assert!(json["started_at"].is_string());
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        let node = NodeFacts::for_os("freebsd", "14.1");
        let report = RunReport::new(Utc::now(), Utc::now(), false, &node, &summary());
        report.write(&path).unwrap();

        let back: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.node, node);
        assert_eq!(back.resources.len(), 2);
        assert_eq!(back.counts.updated, 1);
    }

    #[test]
    fn test_unwritable_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("report.json");
        let report = RunReport::new(
            Utc::now(),
            Utc::now(),
            false,
            &NodeFacts::for_os("linux", ""),
            &RunSummary::default(),
        );
        assert!(report.write(&path).is_err());
    }
}
