//! Field validation for registration and key requests
//!
//! Everything here runs before the store is touched.

use std::collections::HashSet;

use crate::crypto::validate_public_key;
use crate::types::{NewKeyRequest, RegisterAgentRequest, UpdateAgentRequest};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_DOMAIN_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 1000;
pub const MAX_KEY_ID_LEN: usize = 100;

/// Validate agent display name
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("Name cannot be empty");
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err("Name must be at most 255 characters");
    }
    Ok(())
}

/// Validate agent domain (absolute http or https URL)
pub fn validate_domain(domain: &str) -> Result<(), &'static str> {
    if domain.is_empty() {
        return Err("Domain cannot be empty");
    }
    if domain.chars().count() > MAX_DOMAIN_LEN {
        return Err("Domain must be at most 255 characters");
    }
    if !(domain.starts_with("http://") || domain.starts_with("https://")) {
        return Err("Domain must start with http:// or https://");
    }
    Ok(())
}

/// Validate description
pub fn validate_description(desc: &str) -> Result<(), &'static str> {
    if desc.chars().count() > MAX_DESCRIPTION_LEN {
        return Err("Description must be at most 1000 characters");
    }
    Ok(())
}

/// Validate contact email shape: `local@host.tld`, no whitespace
pub fn validate_contact_email(email: &str) -> Result<(), &'static str> {
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err("Contact email must be at most 255 characters");
    }
    if email.chars().any(char::is_whitespace) {
        return Err("Contact email cannot contain whitespace");
    }
    let (local, host) = email
        .split_once('@')
        .ok_or("Contact email must contain '@'")?;
    if local.is_empty() || host.contains('@') {
        return Err("Invalid contact email");
    }
    let (name, tld) = host.rsplit_once('.').ok_or("Invalid contact email domain")?;
    if name.is_empty() || tld.is_empty() {
        return Err("Invalid contact email domain");
    }
    Ok(())
}

/// Validate caller-chosen key identifier
pub fn validate_key_id(key_id: &str) -> Result<(), &'static str> {
    if key_id.is_empty() {
        return Err("Key ID cannot be empty");
    }
    if key_id.chars().count() > MAX_KEY_ID_LEN {
        return Err("Key ID must be at most 100 characters");
    }
    Ok(())
}

/// Validate a key before it is stored
pub fn validate_new_key(key: &NewKeyRequest) -> Result<(), String> {
    validate_key_id(&key.key_id).map_err(|e| format!("Key '{}': {}", key.key_id, e))?;
    if !validate_public_key(&key.public_key) {
        return Err(format!(
            "Key '{}': Invalid Ed25519 base58 public key - must be 32 bytes encoded in base58",
            key.key_id
        ));
    }
    if let Some(ref desc) = key.description {
        validate_description(desc).map_err(|e| format!("Key '{}': {}", key.key_id, e))?;
    }
    Ok(())
}

/// Validate a full registration, including every inline key
pub fn validate_registration(req: &RegisterAgentRequest) -> Result<(), String> {
    validate_name(&req.name)?;
    validate_domain(&req.domain)?;
    if let Some(ref desc) = req.description {
        validate_description(desc)?;
    }
    if let Some(ref email) = req.contact_email {
        validate_contact_email(email)?;
    }

    let mut seen = HashSet::new();
    for key in &req.keys {
        validate_new_key(key)?;
        if !seen.insert(key.key_id.as_str()) {
            return Err(format!("Duplicate key_id '{}' in request", key.key_id));
        }
    }
    Ok(())
}

/// Validate the fields present in a partial update
pub fn validate_update(req: &UpdateAgentRequest) -> Result<(), &'static str> {
    if let Some(ref name) = req.name {
        validate_name(name)?;
    }
    if let Some(Some(ref desc)) = req.description {
        validate_description(desc)?;
    }
    if let Some(Some(ref email)) = req.contact_email {
        validate_contact_email(email)?;
    }
    Ok(())
}

/// Treat an empty optional string as absent
pub fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}
