//! Agent and key lifecycle on top of the store
//!
//! Registry calls see every row regardless of status. Callers that present
//! records to outside consumers gate them with [`ensure_agent_active`] and
//! [`ensure_key_active`], which fail with [`ApiError::Inactive`].

mod agents;
mod keys;

pub use agents::{AgentRegistry, Registration};
pub use keys::KeyRegistry;

use rusqlite::Connection;

use crate::db::{self, StorageResult};
use crate::error::{ApiError, ApiResult};
use crate::types::{Agent, AgentId, AgentKey, AgentWithKeys};

fn load_agent_with_keys(conn: &Connection, id: AgentId) -> StorageResult<Option<AgentWithKeys>> {
    let Some(agent) = db::agents::get_agent(conn, id)? else {
        return Ok(None);
    };
    let keys = db::keys::list_keys_for_agent(conn, id)?;
    Ok(Some(AgentWithKeys { agent, keys }))
}

fn agent_not_found(id: AgentId) -> ApiError {
    ApiError::NotFound(format!("Agent not found for ID: {}", id))
}

/// Reject an agent that has been deactivated
pub fn ensure_agent_active(agent: &Agent) -> ApiResult<()> {
    if agent.is_active {
        Ok(())
    } else {
        Err(ApiError::Inactive(format!("Agent is inactive for ID: {}", agent.id)))
    }
}

/// Reject a key that has been deactivated
pub fn ensure_key_active(key: &AgentKey) -> ApiResult<()> {
    if key.is_active {
        Ok(())
    } else {
        Err(ApiError::Inactive(format!(
            "Key '{}' is inactive for agent {}",
            key.key_id, key.agent_id
        )))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use ed25519_dalek::SigningKey;

    use crate::types::{KeyAlgorithm, NewKeyRequest, RegisterAgentRequest};

    /// Base58 public key derived from a fixed seed
    pub fn public_key(seed: u8) -> String {
        let signing_key = SigningKey::from_bytes(&[seed; 32]);
        bs58::encode(signing_key.verifying_key().as_bytes()).into_string()
    }

    pub fn new_key(key_id: &str, seed: u8) -> NewKeyRequest {
        NewKeyRequest {
            key_id: key_id.into(),
            public_key: public_key(seed),
            algorithm: KeyAlgorithm::Ed25519,
            description: None,
            is_active: true,
        }
    }

    pub fn registration(domain: &str, name: &str, keys: Vec<NewKeyRequest>) -> RegisterAgentRequest {
        RegisterAgentRequest {
            name: name.into(),
            domain: domain.into(),
            description: None,
            contact_email: None,
            is_active: true,
            keys,
        }
    }
}
