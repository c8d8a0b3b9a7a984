//! In-memory report store
//!
//! Backs tests and `store.backend = "memory"`. A single write lock
//! serializes updates, matching the row-lock semantics of [`super::Repository`].

use crate::db::{ReportMutation, ReportStore};
use crate::errors::{AppError, Result};
use crate::reports::{Report, ReportKey, ReportMetadata, ReportType};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    reports: RwLock<HashMap<ReportKey, Report>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn get(&self, key: &ReportKey) -> Result<Option<Report>> {
        Ok(self.reports.read().await.get(key).cloned())
    }

    async fn list_by_state(
        &self,
        report_type: ReportType,
        state: &str,
    ) -> Result<Vec<ReportMetadata>> {
        let reports = self.reports.read().await;
        let mut listed: Vec<_> = reports
            .values()
            .filter(|r| r.report_type == report_type && r.state == state)
            .map(Report::metadata)
            .collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(listed)
    }

    async fn insert(&self, report: &Report) -> Result<()> {
        let mut reports = self.reports.write().await;
        let key = report.key();
        if reports.contains_key(&key) {
            return Err(AppError::Internal {
                message: format!("duplicate report {}", key),
            });
        }
        reports.insert(key, report.clone());
        Ok(())
    }

    async fn update(&self, key: &ReportKey, mutate: ReportMutation) -> Result<Option<Report>> {
        let mut reports = self.reports.write().await;
        let Some(stored) = reports.get_mut(key) else {
            return Ok(None);
        };

        // mutate a copy so a failed edit leaves the stored report untouched
        let mut report = stored.clone();
        mutate(&mut report)?;
        *stored = report.clone();
        Ok(Some(report))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::ReportStatus;
    use chrono::{Duration, Utc};
    use serde_json::{json, Map};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn report(id: &str, state: &str, age_secs: i64) -> Report {
        let created = Utc::now() - Duration::seconds(age_secs);
        Report {
            report_type: ReportType::Mcpar,
            state: state.to_string(),
            id: id.to_string(),
            program_name: format!("Program {}", id),
            status: ReportStatus::NotStarted,
            due_date: "06/29/2023".to_string(),
            reporting_period_start_date: "01/01/2022".to_string(),
            reporting_period_end_date: "12/31/2022".to_string(),
            combined_data: false,
            submitted_by: None,
            submitted_on: None,
            created_at: created,
            last_altered: created,
            last_altered_by: "Tester".to_string(),
            archived: false,
            form_template_id: "mcpar-template-v1".to_string(),
            field_data: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_list_by_state_is_scoped_and_ordered() {
        let store = MemoryStore::new();
        store.insert(&report("b", "MD", 10)).await.unwrap();
        store.insert(&report("a", "MD", 20)).await.unwrap();
        store.insert(&report("c", "VA", 30)).await.unwrap();

        let listed = store.list_by_state(ReportType::Mcpar, "MD").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_report_untouched() {
        let store = MemoryStore::new();
        let original = report("a", "MD", 0);
        store.insert(&original).await.unwrap();

        let result = store
            .update(
                &original.key(),
                Box::new(|r: &mut Report| {
                    r.program_name = "changed".to_string();
                    Err(AppError::Unauthorized)
                }),
            )
            .await;
        assert_err!(result);

        let stored = store.get(&original.key()).await.unwrap().unwrap();
        assert_eq!(stored.program_name, original.program_name);
    }

    #[tokio::test]
    async fn test_update_missing_report_is_none() {
        let store = MemoryStore::new();
        let key = ReportKey::new(ReportType::Mcpar, "MD", "missing");
        let updated = store.update(&key, Box::new(|_: &mut Report| Ok(()))).await.unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_field_merges_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let original = report("a", "MD", 0);
        store.insert(&original).await.unwrap();

        let mut handles = Vec::new();
        for n in 0..16 {
            let store = store.clone();
            let key = original.key();
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        &key,
                        Box::new(move |r: &mut Report| {
                            r.field_data.insert(format!("field{}", n), json!(n));
                            Ok(())
                        }),
                    )
                    .await
            }));
        }
        for handle in handles {
            assert_ok!(handle.await.unwrap());
        }

        let stored = store.get(&original.key()).await.unwrap().unwrap();
        assert_eq!(stored.field_data.len(), 16);
        assert_eq!(store.len().await, 1);
    }
}
