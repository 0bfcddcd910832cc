use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use common::ledger::{AuditEntry, AuditLog, LedgerError};

use super::{db_err, timestamp, Database};

#[async_trait]
impl AuditLog for Database {
    async fn append(&self, entry: &AuditEntry) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (file_id, actor, message, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(entry.file_id.to_string())
        .bind(&entry.actor)
        .bind(&entry.message)
        .bind(entry.created_at.timestamp())
        .execute(self.pool())
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn entries_for(&self, file_id: Uuid) -> Result<Vec<AuditEntry>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT actor, message, created_at FROM audit_log
            WHERE file_id = ?
            ORDER BY id
            "#,
        )
        .bind(file_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|r| {
                Ok(AuditEntry {
                    file_id,
                    actor: r.get("actor"),
                    message: r.get("message"),
                    created_at: timestamp(r.get("created_at"))?,
                })
            })
            .collect()
    }
}
