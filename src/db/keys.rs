//! Queries on the `agent_keys` table

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::StorageResult;
use crate::types::{flag, AgentId, AgentKey, KeyAlgorithm, KeyRowId, NewKeyRequest};

/// Mutable key columns
#[derive(Debug, Clone)]
pub struct KeyFields<'a> {
    pub key_id: &'a str,
    pub public_key: &'a str,
    pub algorithm: KeyAlgorithm,
    pub description: Option<&'a str>,
    pub is_active: bool,
}

impl<'a> From<&'a NewKeyRequest> for KeyFields<'a> {
    fn from(req: &'a NewKeyRequest) -> Self {
        Self {
            key_id: &req.key_id,
            public_key: &req.public_key,
            algorithm: req.algorithm,
            description: req.description.as_deref().filter(|d| !d.is_empty()),
            is_active: req.is_active,
        }
    }
}

impl ToSql for KeyAlgorithm {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for KeyAlgorithm {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl AgentKey {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let is_active: String = row.get("is_active")?;
        Ok(Self {
            id: row.get("id")?,
            agent_id: row.get("agent_id")?,
            key_id: row.get("key_id")?,
            public_key: row.get("public_key")?,
            algorithm: row.get("algorithm")?,
            description: row.get("description")?,
            is_active: flag::parse(&is_active).unwrap_or(false),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// All keys of an agent in insertion order
pub fn list_keys_for_agent(conn: &Connection, agent_id: AgentId) -> StorageResult<Vec<AgentKey>> {
    let mut stmt = conn.prepare("SELECT * FROM agent_keys WHERE agent_id = ? ORDER BY id")?;
    let keys = stmt
        .query_map(params![agent_id], AgentKey::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}

/// Key by `(agent_id, key_id)`
pub fn get_key(conn: &Connection, agent_id: AgentId, key_id: &str) -> StorageResult<Option<AgentKey>> {
    let key = conn
        .query_row(
            "SELECT * FROM agent_keys WHERE agent_id = ? AND key_id = ?",
            params![agent_id, key_id],
            AgentKey::from_row,
        )
        .optional()?;
    Ok(key)
}

/// Global lookup by `key_id`. The earliest row wins when agents share an id.
pub fn get_key_by_key_id(conn: &Connection, key_id: &str) -> StorageResult<Option<AgentKey>> {
    let key = conn
        .query_row(
            "SELECT * FROM agent_keys WHERE key_id = ? ORDER BY id LIMIT 1",
            params![key_id],
            AgentKey::from_row,
        )
        .optional()?;
    Ok(key)
}

/// Insert a key for an agent, returning the row id
pub fn insert_key(
    conn: &Connection,
    agent_id: AgentId,
    fields: &KeyFields<'_>,
    now: DateTime<Utc>,
) -> StorageResult<KeyRowId> {
    conn.execute(
        r#"
        INSERT INTO agent_keys (agent_id, key_id, public_key, algorithm, description, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            agent_id,
            fields.key_id,
            fields.public_key,
            fields.algorithm,
            fields.description,
            flag::as_str(fields.is_active),
            now,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite mutable columns of a key row
pub fn update_key(
    conn: &Connection,
    id: KeyRowId,
    fields: &KeyFields<'_>,
    now: DateTime<Utc>,
) -> StorageResult<bool> {
    let changed = conn.execute(
        r#"
        UPDATE agent_keys
        SET key_id = ?, public_key = ?, algorithm = ?, description = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
        params![
            fields.key_id,
            fields.public_key,
            fields.algorithm,
            fields.description,
            flag::as_str(fields.is_active),
            now,
            id,
        ],
    )?;
    Ok(changed > 0)
}

/// Hard delete of a single key row
pub fn delete_key(conn: &Connection, id: KeyRowId) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM agent_keys WHERE id = ?", params![id])?;
    Ok(changed > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::agents::{delete_agent, insert_agent, AgentFields};
    use crate::db::{Database, StorageError};

    const PK: &str = "4vJ9JU1bJJE96FWSJKvHsmmFADCg4gpZQff4P3bkLKi";

    fn agent(conn: &Connection, domain: &str) -> StorageResult<AgentId> {
        let fields = AgentFields {
            name: "A",
            description: None,
            contact_email: None,
            is_active: true,
        };
        insert_agent(conn, domain, &fields, Utc::now())
    }

    fn key(key_id: &str) -> KeyFields<'_> {
        KeyFields {
            key_id,
            public_key: PK,
            algorithm: KeyAlgorithm::Ed25519,
            description: None,
            is_active: true,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let db = Database::open_in_memory().unwrap();

        let found = db
            .with_conn(|conn| {
                let agent_id = agent(conn, "https://a.example")?;
                insert_key(conn, agent_id, &key("k1"), Utc::now())?;
                get_key(conn, agent_id, "k1")
            })
            .unwrap()
            .unwrap();

        assert_eq!(found.key_id, "k1");
        assert_eq!(found.public_key, PK);
        assert_eq!(found.algorithm, KeyAlgorithm::Ed25519);
        assert!(found.is_active);
    }

    #[test]
    fn test_key_id_unique_per_agent_only() {
        let db = Database::open_in_memory().unwrap();

        let result = db.with_conn(|conn| {
            let a = agent(conn, "https://a.example")?;
            let b = agent(conn, "https://b.example")?;
            insert_key(conn, a, &key("shared"), Utc::now())?;
            insert_key(conn, b, &key("shared"), Utc::now())?;
            insert_key(conn, a, &key("shared"), Utc::now())
        });
        assert!(matches!(result, Err(StorageError::Constraint(_))));
    }

    #[test]
    fn test_global_lookup_prefers_earliest() {
        let db = Database::open_in_memory().unwrap();

        let (first, found) = db
            .with_conn(|conn| {
                let a = agent(conn, "https://a.example")?;
                let b = agent(conn, "https://b.example")?;
                insert_key(conn, a, &key("shared"), Utc::now())?;
                insert_key(conn, b, &key("shared"), Utc::now())?;
                Ok::<_, StorageError>((a, get_key_by_key_id(conn, "shared")?))
            })
            .unwrap();

        assert_eq!(found.unwrap().agent_id, first);
    }

    #[test]
    fn test_key_requires_existing_agent() {
        let db = Database::open_in_memory().unwrap();
        let result = db.with_conn(|conn| insert_key(conn, 99, &key("k1"), Utc::now()));
        assert!(matches!(result, Err(StorageError::Constraint(_))));
    }

    #[test]
    fn test_agent_delete_cascades_to_keys() {
        let db = Database::open_in_memory().unwrap();

        let remaining = db
            .with_conn(|conn| {
                let a = agent(conn, "https://a.example")?;
                insert_key(conn, a, &key("k1"), Utc::now())?;
                insert_key(conn, a, &key("k2"), Utc::now())?;
                delete_agent(conn, a)?;
                list_keys_for_agent(conn, a)
            })
            .unwrap();

        assert!(remaining.is_empty());
    }

    #[test]
    fn test_update_and_delete_key() {
        let db = Database::open_in_memory().unwrap();

        let (updated, after_delete) = db
            .with_conn(|conn| {
                let a = agent(conn, "https://a.example")?;
                let row = insert_key(conn, a, &key("k1"), Utc::now())?;

                let mut fields = key("k1");
                fields.description = Some("rotated");
                fields.is_active = false;
                update_key(conn, row, &fields, Utc::now())?;
                let updated = get_key(conn, a, "k1")?;

                delete_key(conn, row)?;
                Ok::<_, StorageError>((updated, get_key(conn, a, "k1")?))
            })
            .unwrap();

        let updated = updated.unwrap();
        assert_eq!(updated.description.as_deref(), Some("rotated"));
        assert!(!updated.is_active);
        assert!(after_delete.is_none());
    }
}
