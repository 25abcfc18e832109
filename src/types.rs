//! Core types for the agent registry
//!
//! Records, request bodies and response envelopes. Status flags are native
//! booleans that travel as the literals `"true"` / `"false"` on the wire.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Surrogate identifier assigned by the store
pub type AgentId = i64;

/// Surrogate identifier of a key row
pub type KeyRowId = i64;

// ============ Records ============

/// Signature scheme of a registered key. Ed25519 is the only one accepted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    #[default]
    Ed25519,
}

impl KeyAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyAlgorithm::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ed25519" => Ok(KeyAlgorithm::Ed25519),
            other => Err(format!("Unsupported key algorithm: {}", other)),
        }
    }
}

/// Registered agent
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    /// Absolute http(s) URL, unique across the registry
    pub domain: String,
    pub description: Option<String>,
    pub contact_email: Option<String>,
    #[serde(with = "flag")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public key owned by an agent
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentKey {
    pub id: KeyRowId,
    pub agent_id: AgentId,
    /// Caller-chosen, unique within the owning agent
    pub key_id: String,
    /// Base58 Ed25519 public key (32 bytes decoded)
    pub public_key: String,
    pub algorithm: KeyAlgorithm,
    pub description: Option<String>,
    #[serde(with = "flag")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Agent together with every key it owns
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentWithKeys {
    #[serde(flatten)]
    pub agent: Agent,
    pub keys: Vec<AgentKey>,
}

/// Key joined with its owning agent
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedKey {
    pub key: AgentKey,
    pub agent: Agent,
}

// ============ Requests ============

/// Agent registration (upsert by domain)
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default = "active", with = "flag")]
    pub is_active: bool,
    #[serde(default)]
    pub keys: Vec<NewKeyRequest>,
}

/// Key supplied inline with a registration or through the add-key endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct NewKeyRequest {
    pub key_id: String,
    pub public_key: String,
    pub algorithm: KeyAlgorithm,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "active", with = "flag")]
    pub is_active: bool,
}

/// Partial agent update. `null` clears an optional field, absence keeps it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAgentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub contact_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "flag::deserialize_some")]
    pub is_active: Option<bool>,
}

fn active() -> bool {
    true
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// ============ Responses ============

/// Envelope for errors and bare acknowledgements
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            hint: None,
        }
    }

    pub fn error_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            hint: Some(hint.into()),
        }
    }
}

/// Registration and update result
#[derive(Debug, Serialize)]
pub struct AgentResponse {
    pub success: bool,
    pub message: String,
    pub agent: AgentWithKeys,
}

/// Add-key result
#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub success: bool,
    pub message: String,
    pub key: AgentKey,
}

/// Key resolved back to its owner
#[derive(Debug, Serialize)]
pub struct KeyLookupResponse {
    pub agent_id: AgentId,
    pub agent_name: String,
    pub agent_domain: String,
    pub key_id: String,
    #[serde(with = "flag")]
    pub is_active: bool,
    pub public_key: String,
    pub algorithm: KeyAlgorithm,
    pub description: Option<String>,
}

impl From<&OwnedKey> for KeyLookupResponse {
    fn from(owned: &OwnedKey) -> Self {
        Self {
            agent_id: owned.agent.id,
            agent_name: owned.agent.name.clone(),
            agent_domain: owned.agent.domain.clone(),
            key_id: owned.key.key_id.clone(),
            is_active: owned.key.is_active,
            public_key: owned.key.public_key.clone(),
            algorithm: owned.key.algorithm,
            description: owned.key.description.clone(),
        }
    }
}

/// Service banner
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub uptime_seconds: u64,
}

// ============ Status flag encoding ============

/// Serde adapter for status flags.
///
/// Serializes as `"true"` / `"false"`; accepts those literals or a JSON bool.
pub mod flag {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const TRUE: &str = "true";
    pub const FALSE: &str = "false";

    pub fn as_str(value: bool) -> &'static str {
        if value {
            TRUE
        } else {
            FALSE
        }
    }

    pub fn parse(value: &str) -> Option<bool> {
        match value {
            TRUE => Some(true),
            FALSE => Some(false),
            _ => None,
        }
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(as_str(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(b),
            Raw::Text(s) => parse(&s).ok_or_else(|| {
                D::Error::custom(format!("expected \"true\" or \"false\", got {:?}", s))
            }),
        }
    }

    pub fn deserialize_some<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<bool>, D::Error> {
        deserialize(deserializer).map(Some)
    }
}
