use std::sync::Arc;

use chrono::Utc;

use super::{agent_not_found, load_agent_with_keys};
use crate::db::agents::{self as agent_rows, AgentFields};
use crate::db::keys::{self as key_rows, KeyFields};
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::{AgentId, AgentWithKeys, RegisterAgentRequest, UpdateAgentRequest};
use crate::validation::{non_empty, validate_registration, validate_update};

/// Outcome of a registration call
#[derive(Debug, Clone)]
pub struct Registration {
    pub agent: AgentWithKeys,
    /// False when an existing agent with the same domain was updated
    pub created: bool,
}

/// Agent lifecycle: upsert by domain, lookup, partial update, soft delete
#[derive(Clone)]
pub struct AgentRegistry {
    db: Arc<Database>,
}

impl AgentRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create or update the agent owning `req.domain`, upserting each inline key.
    ///
    /// Every field and key is validated before the store is touched, and the
    /// whole sequence runs in one transaction. Keys missing from `req.keys`
    /// are left as they are.
    pub fn register(&self, req: RegisterAgentRequest) -> ApiResult<Registration> {
        validate_registration(&req)
            .map_err(|e| ApiError::bad_request_with_hint(e, "Keys must be 32-byte Ed25519 public keys in base58"))?;

        let description = non_empty(&req.description);
        let contact_email = non_empty(&req.contact_email);
        let fields = AgentFields {
            name: &req.name,
            description: description.as_deref(),
            contact_email: contact_email.as_deref(),
            is_active: req.is_active,
        };
        let now = Utc::now();

        let registration = self.db.with_tx(|tx| {
            let (agent_id, created) = match agent_rows::get_agent_by_domain(tx, &req.domain)? {
                Some(existing) => {
                    agent_rows::update_agent(tx, existing.id, &fields, now)?;
                    for key in &req.keys {
                        let key_fields = KeyFields::from(key);
                        match key_rows::get_key(tx, existing.id, &key.key_id)? {
                            Some(row) => {
                                key_rows::update_key(tx, row.id, &key_fields, now)?;
                            }
                            None => {
                                key_rows::insert_key(tx, existing.id, &key_fields, now)?;
                            }
                        }
                    }
                    (existing.id, false)
                }
                None => {
                    let id = agent_rows::insert_agent(tx, &req.domain, &fields, now)?;
                    for key in &req.keys {
                        key_rows::insert_key(tx, id, &KeyFields::from(key), now)?;
                    }
                    (id, true)
                }
            };

            let agent = load_agent_with_keys(tx, agent_id)?
                .ok_or_else(|| ApiError::Internal("Agent missing after registration".into()))?;
            Ok::<_, ApiError>(Registration { agent, created })
        })?;

        if registration.created {
            tracing::info!(
                "New agent registered for domain: {}, ID: {}",
                req.domain,
                registration.agent.agent.id
            );
        } else {
            tracing::info!("Updated agent registration for domain: {}", req.domain);
        }

        Ok(registration)
    }

    /// Fetch by id with every key, whatever the agent's status
    pub fn get(&self, id: AgentId) -> ApiResult<AgentWithKeys> {
        self.db
            .with_conn(|conn| load_agent_with_keys(conn, id))?
            .ok_or_else(|| agent_not_found(id))
    }

    /// Fetch by unique domain with every key
    pub fn get_by_domain(&self, domain: &str) -> ApiResult<AgentWithKeys> {
        self.db
            .with_conn(|conn| {
                match agent_rows::get_agent_by_domain(conn, domain)? {
                    Some(agent) => load_agent_with_keys(conn, agent.id),
                    None => Ok(None),
                }
            })?
            .ok_or_else(|| ApiError::NotFound(format!("Agent not found for domain: {}", domain)))
    }

    /// All agents with their keys, optionally restricted to active ones
    pub fn list(&self, active_only: bool) -> ApiResult<Vec<AgentWithKeys>> {
        let agents = self.db.with_conn(|conn| {
            agent_rows::list_agents(conn, active_only)?
                .into_iter()
                .map(|agent| {
                    let keys = key_rows::list_keys_for_agent(conn, agent.id)?;
                    Ok::<_, ApiError>(AgentWithKeys { agent, keys })
                })
                .collect::<Result<Vec<_>, _>>()
        })?;

        tracing::debug!("Listed {} agents (active_only={})", agents.len(), active_only);
        Ok(agents)
    }

    /// Merge the present fields onto the stored agent. The domain never changes.
    pub fn update(&self, id: AgentId, req: UpdateAgentRequest) -> ApiResult<AgentWithKeys> {
        validate_update(&req).map_err(|e| ApiError::BadRequest(e.into()))?;

        let updated = self.db.with_tx(|tx| {
            let existing = agent_rows::get_agent(tx, id)?.ok_or_else(|| agent_not_found(id))?;

            let name = req.name.clone().unwrap_or(existing.name);
            let description = match req.description.clone() {
                Some(value) => value.filter(|s| !s.is_empty()),
                None => existing.description,
            };
            let contact_email = match req.contact_email.clone() {
                Some(value) => value.filter(|s| !s.is_empty()),
                None => existing.contact_email,
            };
            let fields = AgentFields {
                name: &name,
                description: description.as_deref(),
                contact_email: contact_email.as_deref(),
                is_active: req.is_active.unwrap_or(existing.is_active),
            };

            agent_rows::update_agent(tx, id, &fields, Utc::now())?;
            load_agent_with_keys(tx, id)?.ok_or_else(|| agent_not_found(id))
        })?;

        tracing::info!("Updated agent for ID: {}", id);
        Ok(updated)
    }

    /// Soft delete. Deactivating an inactive agent succeeds.
    pub fn deactivate(&self, id: AgentId) -> ApiResult<()> {
        let found = self
            .db
            .with_conn(|conn| agent_rows::set_agent_active(conn, id, false, Utc::now()))?;

        if !found {
            return Err(agent_not_found(id));
        }

        tracing::info!("Deactivated agent for ID: {}", id);
        Ok(())
    }
}
