use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use common::fs::{FileNode, FileTree};
use common::ledger::{FileStore, LedgerError};

use super::{db_err, timestamp, Database};

fn parse_uuid(text: &str) -> Result<Uuid, LedgerError> {
    Uuid::parse_str(text)
        .map_err(|_| LedgerError::Provider(anyhow::anyhow!("invalid uuid in files table: {text}")))
}

fn node_from_row(row: &SqliteRow) -> Result<FileNode, LedgerError> {
    let parent: Option<String> = row.get("parent_id");
    Ok(FileNode {
        id: parse_uuid(row.get::<String, _>("id").as_str())?,
        encrypted_name: row.get("encrypted_name"),
        owner: row.get("owner"),
        parent: parent.as_deref().map(parse_uuid).transpose()?,
        is_dir: row.get::<i64, _>("is_dir") != 0,
        needs_rekey: row.get::<i64, _>("needs_rekey") != 0,
        storage_path: row.get("storage_path"),
        created_at: timestamp(row.get("created_at"))?,
        modified_at: timestamp(row.get("modified_at"))?,
    })
}

const NODE_COLUMNS: &str = "id, encrypted_name, owner, parent_id, is_dir, \
                            needs_rekey, storage_path, created_at, modified_at";

#[async_trait]
impl FileStore for Database {
    async fn insert_node(&self, node: &FileNode) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO files
                (id, encrypted_name, owner, parent_id, is_dir, needs_rekey,
                 storage_path, created_at, modified_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(node.id.to_string())
        .bind(&node.encrypted_name)
        .bind(&node.owner)
        .bind(node.parent.map(|p| p.to_string()))
        .bind(node.is_dir)
        .bind(node.needs_rekey)
        .bind(node.storage_path.clone())
        .bind(node.created_at.timestamp())
        .bind(node.modified_at.timestamp())
        .execute(self.pool())
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn node(&self, id: Uuid) -> Result<Option<FileNode>, LedgerError> {
        let row = sqlx::query(&format!("SELECT {NODE_COLUMNS} FROM files WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(db_err)?;

        row.as_ref().map(node_from_row).transpose()
    }

    async fn set_name(&self, id: Uuid, encrypted_name: &str) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE files SET encrypted_name = ?, modified_at = ? WHERE id = ?")
            .bind(encrypted_name)
            .bind(Utc::now().timestamp())
            .bind(id.to_string())
            .execute(self.pool())
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::FileNotFound(id));
        }
        Ok(())
    }

    async fn touch(&self, id: Uuid) -> Result<(), LedgerError> {
        let result = sqlx::query("UPDATE files SET modified_at = ? WHERE id = ?")
            .bind(Utc::now().timestamp())
            .bind(id.to_string())
            .execute(self.pool())
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::FileNotFound(id));
        }
        Ok(())
    }

    async fn delete_node(&self, id: Uuid) -> Result<(), LedgerError> {
        sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool())
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn children(&self, parent: Uuid) -> Result<Vec<FileNode>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {NODE_COLUMNS} FROM files WHERE parent_id = ? ORDER BY id"
        ))
        .bind(parent.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        rows.iter().map(node_from_row).collect()
    }

    async fn subtree(&self, root: Uuid) -> Result<FileTree, LedgerError> {
        let rows = sqlx::query(&format!(
            r#"
            WITH RECURSIVE sub (id) AS (
                SELECT id FROM files WHERE id = ?
                UNION ALL
                SELECT f.id FROM files f JOIN sub s ON f.parent_id = s.id
            )
            SELECT {NODE_COLUMNS} FROM files WHERE id IN (SELECT id FROM sub)
            "#
        ))
        .bind(root.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(db_err)?;

        let nodes: Result<Vec<FileNode>, LedgerError> = rows.iter().map(node_from_row).collect();
        Ok(FileTree::from_nodes(nodes?))
    }
}
