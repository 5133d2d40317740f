//! Credential storage
//!
//! Maps configured bearer tokens to the actors holding them.

use std::collections::BTreeSet;
use subtle::ConstantTimeEq;

use crate::config::ApiKeyConfig;

/// An authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub capabilities: BTreeSet<String>,
}

impl Actor {
    pub fn new<I, S>(id: impl Into<String>, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }
}

/// Token table loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: Vec<(Vec<u8>, Actor)>,
}

impl CredentialStore {
    pub fn from_config(keys: &[ApiKeyConfig]) -> Self {
        Self {
            entries: keys
                .iter()
                .map(|key| {
                    (
                        key.token.trim().as_bytes().to_vec(),
                        Actor::new(key.actor_id.clone(), key.capabilities.iter().cloned()),
                    )
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Actor owning `token`. Every entry is compared in constant time so the
    /// lookup does not leak how much of a token matched.
    pub fn lookup(&self, token: &str) -> Option<Actor> {
        let token = token.as_bytes();
        let mut found = None;
        for (candidate, actor) in &self.entries {
            if bool::from(candidate.as_slice().ct_eq(token)) && found.is_none() {
                found = Some(actor.clone());
            }
        }
        found
    }
}
