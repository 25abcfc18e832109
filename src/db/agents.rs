//! Queries on the `agents` table

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::StorageResult;
use crate::types::{flag, Agent, AgentId};

/// Mutable agent columns
#[derive(Debug, Clone)]
pub struct AgentFields<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub contact_email: Option<&'a str>,
    pub is_active: bool,
}

impl Agent {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        let is_active: String = row.get("is_active")?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            domain: row.get("domain")?,
            description: row.get("description")?,
            contact_email: row.get("contact_email")?,
            is_active: flag::parse(&is_active).unwrap_or(false),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Get agent by surrogate id
pub fn get_agent(conn: &Connection, id: AgentId) -> StorageResult<Option<Agent>> {
    let agent = conn
        .query_row("SELECT * FROM agents WHERE id = ?", params![id], Agent::from_row)
        .optional()?;
    Ok(agent)
}

/// Get agent by its unique domain
pub fn get_agent_by_domain(conn: &Connection, domain: &str) -> StorageResult<Option<Agent>> {
    let agent = conn
        .query_row(
            "SELECT * FROM agents WHERE domain = ?",
            params![domain],
            Agent::from_row,
        )
        .optional()?;
    Ok(agent)
}

/// List agents in insertion order
pub fn list_agents(conn: &Connection, active_only: bool) -> StorageResult<Vec<Agent>> {
    let sql = if active_only {
        "SELECT * FROM agents WHERE is_active = 'true' ORDER BY id"
    } else {
        "SELECT * FROM agents ORDER BY id"
    };

    let mut stmt = conn.prepare(sql)?;
    let agents = stmt
        .query_map([], Agent::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(agents)
}

/// Count all agent rows
#[cfg(test)]
pub fn count_agents(conn: &Connection) -> StorageResult<u64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM agents", [], |row| row.get(0))?;
    Ok(count as u64)
}

/// Insert a new agent, returning its id
pub fn insert_agent(
    conn: &Connection,
    domain: &str,
    fields: &AgentFields<'_>,
    now: DateTime<Utc>,
) -> StorageResult<AgentId> {
    conn.execute(
        r#"
        INSERT INTO agents (name, domain, description, contact_email, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            fields.name,
            domain,
            fields.description,
            fields.contact_email,
            flag::as_str(fields.is_active),
            now,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite mutable columns. Returns false if no row matched.
pub fn update_agent(
    conn: &Connection,
    id: AgentId,
    fields: &AgentFields<'_>,
    now: DateTime<Utc>,
) -> StorageResult<bool> {
    let changed = conn.execute(
        r#"
        UPDATE agents
        SET name = ?, description = ?, contact_email = ?, is_active = ?, updated_at = ?
        WHERE id = ?
        "#,
        params![
            fields.name,
            fields.description,
            fields.contact_email,
            flag::as_str(fields.is_active),
            now,
            id,
        ],
    )?;
    Ok(changed > 0)
}

/// Set the status flag. Returns false if no row matched.
pub fn set_agent_active(
    conn: &Connection,
    id: AgentId,
    is_active: bool,
    now: DateTime<Utc>,
) -> StorageResult<bool> {
    let changed = conn.execute(
        "UPDATE agents SET is_active = ?, updated_at = ? WHERE id = ?",
        params![flag::as_str(is_active), now, id],
    )?;
    Ok(changed > 0)
}

/// Hard delete; keys go with it through the FK cascade
pub fn delete_agent(conn: &Connection, id: AgentId) -> StorageResult<bool> {
    let changed = conn.execute("DELETE FROM agents WHERE id = ?", params![id])?;
    Ok(changed > 0)
}
