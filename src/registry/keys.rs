use std::sync::Arc;

use chrono::Utc;

use super::agent_not_found;
use crate::db::agents as agent_rows;
use crate::db::keys::{self as key_rows, KeyFields};
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::{AgentId, AgentKey, NewKeyRequest, OwnedKey};
use crate::validation::validate_new_key;

fn key_not_found(agent_id: AgentId, key_id: &str) -> ApiError {
    ApiError::NotFound(format!("Key '{}' not found for agent {}", key_id, agent_id))
}

/// Per-agent key lifecycle and key-to-agent resolution
#[derive(Clone)]
pub struct KeyRegistry {
    db: Arc<Database>,
}

impl KeyRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Add a key to an existing agent. A `key_id` already used by that agent
    /// is a conflict; nothing is overwritten.
    pub fn add_key(&self, agent_id: AgentId, req: NewKeyRequest) -> ApiResult<AgentKey> {
        validate_new_key(&req).map_err(ApiError::BadRequest)?;

        let key = self.db.with_tx(|tx| {
            if agent_rows::get_agent(tx, agent_id)?.is_none() {
                return Err(agent_not_found(agent_id));
            }
            if key_rows::get_key(tx, agent_id, &req.key_id)?.is_some() {
                return Err(ApiError::Conflict(format!(
                    "Key '{}' already exists for agent {}",
                    req.key_id, agent_id
                )));
            }

            key_rows::insert_key(tx, agent_id, &KeyFields::from(&req), Utc::now())?;
            key_rows::get_key(tx, agent_id, &req.key_id)?
                .ok_or_else(|| ApiError::Internal("Key missing after insert".into()))
        })?;

        tracing::info!(
            "Added {} key '{}' to agent ID: {}",
            key.algorithm, key.key_id, agent_id
        );
        Ok(key)
    }

    /// Global lookup by `key_id`, joined with the owning agent
    pub fn get_by_key_id(&self, key_id: &str) -> ApiResult<OwnedKey> {
        let owned = self.db.with_conn(|conn| {
            let Some(key) = key_rows::get_key_by_key_id(conn, key_id)? else {
                return Err(ApiError::NotFound(format!("Key not found for ID: {}", key_id)));
            };
            let agent = agent_rows::get_agent(conn, key.agent_id)?
                .ok_or_else(|| agent_not_found(key.agent_id))?;
            Ok(OwnedKey { key, agent })
        })?;
        Ok(owned)
    }

    /// Key `key_id` of agent `agent_id`, joined with the agent
    pub fn get_for_agent(&self, agent_id: AgentId, key_id: &str) -> ApiResult<OwnedKey> {
        self.db.with_conn(|conn| {
            let agent = agent_rows::get_agent(conn, agent_id)?.ok_or_else(|| agent_not_found(agent_id))?;
            let key = key_rows::get_key(conn, agent_id, key_id)?
                .ok_or_else(|| key_not_found(agent_id, key_id))?;
            Ok(OwnedKey { key, agent })
        })
    }

    /// Every key of an agent, active or not
    pub fn list_for_agent(&self, agent_id: AgentId) -> ApiResult<Vec<AgentKey>> {
        self.db.with_conn(|conn| {
            if agent_rows::get_agent(conn, agent_id)?.is_none() {
                return Err(agent_not_found(agent_id));
            }
            Ok(key_rows::list_keys_for_agent(conn, agent_id)?)
        })
    }

    /// Hard delete a single key. Returns false when there was nothing to remove.
    pub fn remove_key(&self, agent_id: AgentId, key_id: &str) -> ApiResult<bool> {
        let removed = self.db.with_tx(|tx| {
            match key_rows::get_key(tx, agent_id, key_id)? {
                Some(key) => key_rows::delete_key(tx, key.id),
                None => Ok(false),
            }
        })?;

        if removed {
            tracing::info!("Removed key '{}' from agent ID: {}", key_id, agent_id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::fixtures::{new_key, registration};
    use crate::registry::{ensure_agent_active, ensure_key_active, AgentRegistry};

    fn registries() -> (AgentRegistry, KeyRegistry) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        (AgentRegistry::new(Arc::clone(&db)), KeyRegistry::new(db))
    }

    fn register(agents: &AgentRegistry, domain: &str) -> AgentId {
        agents
            .register(registration(domain, "A", vec![new_key("k1", 1)]))
            .unwrap()
            .agent
            .agent
            .id
    }

    #[test]
    fn test_add_key() {
        let (agents, keys) = registries();
        let id = register(&agents, "https://a.example");

        let key = keys.add_key(id, new_key("k2", 2)).unwrap();
        assert_eq!(key.agent_id, id);
        assert_eq!(key.key_id, "k2");
        assert_eq!(keys.list_for_agent(id).unwrap().len(), 2);
    }

    #[test]
    fn test_add_duplicate_key_is_conflict() {
        let (agents, keys) = registries();
        let id = register(&agents, "https://a.example");
        let before = keys.list_for_agent(id).unwrap();

        let err = keys.add_key(id, new_key("k1", 9)).unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));

        assert_eq!(keys.list_for_agent(id).unwrap(), before);
    }

    #[test]
    fn test_add_key_to_missing_agent() {
        let (_agents, keys) = registries();
        let err = keys.add_key(42, new_key("k1", 1)).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn test_add_key_rejects_invalid_public_key() {
        let (agents, keys) = registries();
        let id = register(&agents, "https://a.example");

        let mut bad = new_key("k2", 2);
        bad.public_key = "0OIl".into();
        assert!(matches!(keys.add_key(id, bad), Err(ApiError::BadRequest(_))));
        assert_eq!(keys.list_for_agent(id).unwrap().len(), 1);
    }

    #[test]
    fn test_same_key_id_under_different_agents() {
        let (agents, keys) = registries();
        let a = register(&agents, "https://a.example");
        let b = register(&agents, "https://b.example");

        assert_eq!(keys.get_for_agent(b, "k1").unwrap().key.agent_id, b);
        // Global lookup resolves to the first registration
        let owned = keys.get_by_key_id("k1").unwrap();
        assert_eq!(owned.agent.id, a);
        assert_eq!(owned.agent.domain, "https://a.example");
    }

    #[test]
    fn test_lookup_missing() {
        let (agents, keys) = registries();
        let id = register(&agents, "https://a.example");

        assert!(matches!(keys.get_by_key_id("nope"), Err(ApiError::NotFound(_))));
        assert!(matches!(keys.get_for_agent(id, "nope"), Err(ApiError::NotFound(_))));
        assert!(matches!(keys.get_for_agent(99, "k1"), Err(ApiError::NotFound(_))));
        assert!(matches!(keys.list_for_agent(99), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_inactive_key_is_visible_internally_only() {
        let (agents, keys) = registries();
        let id = register(&agents, "https://a.example");

        let mut inactive = new_key("k2", 2);
        inactive.is_active = false;
        keys.add_key(id, inactive).unwrap();

        let owned = keys.get_for_agent(id, "k2").unwrap();
        assert!(!owned.key.is_active);
        assert!(matches!(ensure_key_active(&owned.key), Err(ApiError::Inactive(_))));
        assert!(ensure_agent_active(&owned.agent).is_ok());
    }

    #[test]
    fn test_remove_key() {
        let (agents, keys) = registries();
        let id = register(&agents, "https://a.example");

        assert!(keys.remove_key(id, "k1").unwrap());
        assert!(!keys.remove_key(id, "k1").unwrap());
        assert!(keys.list_for_agent(id).unwrap().is_empty());
    }
}
