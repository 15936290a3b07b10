use crate::error::CoreError;
use crate::models::{ExternalRecord, IngestReport, NewTaskData};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use tracing::{debug, info};

const UNTITLED: &str = "(no subject)";

#[async_trait]
impl super::IngestRepository for SqliteRepository {
    async fn ingest_external(
        &self,
        section_id: i64,
        records: Vec<ExternalRecord>,
    ) -> Result<IngestReport, CoreError> {
        let mut tx = self.pool().begin().await?;
        Self::fetch_section_in_transaction(&mut tx, section_id).await?;

        let mut report = IngestReport::default();
        for record in records {
            let external_id = record.external_id.trim();
            if external_id.is_empty() {
                debug!(title = %record.title, "record without external id skipped");
                report.skipped += 1;
                continue;
            }
            if Self::find_task_by_external_id_in_transaction(&mut tx, external_id)
                .await?
                .is_some()
            {
                report.skipped += 1;
                continue;
            }

            let title = match record.title.trim() {
                "" => UNTITLED.to_string(),
                title => title.to_string(),
            };
            self.create_task_in_transaction(
                &mut tx,
                NewTaskData {
                    section_id: Some(section_id),
                    title,
                    notes: record.notes,
                    external_id: Some(external_id.to_string()),
                    ..Default::default()
                },
            )
            .await?;
            report.created += 1;
        }

        tx.commit().await?;
        info!(section_id, created = report.created, skipped = report.skipped, "ingested external records");
        Ok(report)
    }
}
