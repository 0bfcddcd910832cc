use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use common::crypto::WrappedKey;
use common::ledger::{AccessGrant, AccessLedger, LedgerError};

use super::{db_err, Database};

fn wrapped_from_blob(blob: &[u8]) -> Result<WrappedKey, LedgerError> {
    WrappedKey::try_from(blob).map_err(|e| LedgerError::Provider(e.into()))
}

#[async_trait]
impl AccessLedger for Database {
    async fn grants_for(&self, file_id: Uuid) -> Result<Vec<AccessGrant>, LedgerError> {
        let rows = sqlx::query(
            r#"
            SELECT member, wrapped_key FROM grants
            WHERE file_id = ?
            ORDER BY member
            "#,
        )
        .bind(file_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        rows.iter()
            .map(|r| {
                Ok(AccessGrant {
                    file_id,
                    member: r.get("member"),
                    wrapped_key: wrapped_from_blob(r.get::<Vec<u8>, _>("wrapped_key").as_slice())?,
                })
            })
            .collect()
    }

    async fn grant_for(
        &self,
        file_id: Uuid,
        member: &str,
    ) -> Result<Option<AccessGrant>, LedgerError> {
        let row = sqlx::query(
            r#"
            SELECT wrapped_key FROM grants
            WHERE file_id = ? AND member = ?
            "#,
        )
        .bind(file_id.to_string())
        .bind(member)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err)?;

        match row {
            Some(r) => Ok(Some(AccessGrant {
                file_id,
                member: member.to_string(),
                wrapped_key: wrapped_from_blob(r.get::<Vec<u8>, _>("wrapped_key").as_slice())?,
            })),
            None => Ok(None),
        }
    }

    async fn replace_grants(
        &self,
        file_id: Uuid,
        grants: Vec<(String, WrappedKey)>,
    ) -> Result<(), LedgerError> {
        let now = Utc::now().timestamp();
        let mut tx = self.pool().begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM grants WHERE file_id = ?")
            .bind(file_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for (member, wrapped_key) in &grants {
            sqlx::query(
                r#"
                INSERT INTO grants (file_id, member, wrapped_key, created_at)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(file_id.to_string())
            .bind(member)
            .bind(wrapped_key.bytes())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn add_grant(
        &self,
        file_id: Uuid,
        member: &str,
        wrapped_key: WrappedKey,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO grants (file_id, member, wrapped_key, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (file_id, member) DO UPDATE SET
                wrapped_key = excluded.wrapped_key,
                created_at = excluded.created_at
            "#,
        )
        .bind(file_id.to_string())
        .bind(member)
        .bind(wrapped_key.bytes())
        .bind(Utc::now().timestamp())
        .execute(self.pool())
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn remove_grant(&self, file_id: Uuid, member: &str) -> Result<bool, LedgerError> {
        let result = sqlx::query("DELETE FROM grants WHERE file_id = ? AND member = ?")
            .bind(file_id.to_string())
            .bind(member)
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_needs_rekey(&self, file_id: Uuid, needs_rekey: bool) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE files SET needs_rekey = ? WHERE id = ?")
            .bind(needs_rekey)
            .bind(file_id.to_string())
            .execute(self.pool())
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::FileNotFound(file_id));
        }
        Ok(())
    }
}
