use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use common::crypto::PublicKey;
use common::ledger::{LedgerError, MemberDirectory, MemberRecord};

use super::{db_err, Database};

#[async_trait]
impl MemberDirectory for Database {
    async fn register_member(&self, record: &MemberRecord) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO members (username, public_key_pem, encrypted_secret_key, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&record.username)
        .bind(record.public_key.to_pem())
        .bind(&record.encrypted_secret_key)
        .bind(Utc::now().timestamp())
        .execute(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_error) if db_error.constraint().is_some() => {
                LedgerError::Provider(anyhow::anyhow!(
                    "username already registered: {}",
                    record.username
                ))
            }
            _ => db_err(e),
        })?;
        Ok(())
    }

    async fn member(&self, username: &str) -> Result<Option<MemberRecord>, LedgerError> {
        let row = sqlx::query(
            "SELECT username, public_key_pem, encrypted_secret_key FROM members WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(db_err)?;

        match row {
            Some(r) => {
                let pem: String = r.get("public_key_pem");
                Ok(Some(MemberRecord {
                    username: r.get("username"),
                    public_key: PublicKey::from_pem(&pem)
                        .map_err(|e| LedgerError::Provider(e.into()))?,
                    encrypted_secret_key: r.get("encrypted_secret_key"),
                }))
            }
            None => Ok(None),
        }
    }

    async fn public_keys(
        &self,
        usernames: &[String],
    ) -> Result<BTreeMap<String, PublicKey>, LedgerError> {
        let mut keys = BTreeMap::new();
        for username in usernames {
            let record = self
                .member(username)
                .await?
                .ok_or_else(|| LedgerError::MemberNotFound(username.clone()))?;
            keys.insert(record.username, record.public_key);
        }
        Ok(keys)
    }
}
