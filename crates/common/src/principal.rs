//! The identity a command is executed on behalf of.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PrincipalId;

/// Claim carrying the caller's email address.
pub const EMAIL_CLAIM: &str = "email";
/// Claim carrying the caller's given name.
pub const GIVEN_NAME_CLAIM: &str = "given_name";
/// Claim carrying `;`-separated policy names.
pub const POLICIES_CLAIM: &str = "policies";

/// The caller on whose behalf a command runs.
///
/// Captured once when a request enters the system and passed explicitly
/// down to the event handlers that stamp audit records with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActingPrincipal {
    pub id: PrincipalId,
    pub name: String,
    #[serde(default)]
    pub claims: BTreeMap<String, String>,
}

impl ActingPrincipal {
    pub fn new(id: PrincipalId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            claims: BTreeMap::new(),
        }
    }

    /// A principal for callers that presented no identity.
    pub fn anonymous() -> Self {
        Self::new(PrincipalId::nil(), "anonymous")
    }

    /// Adds a claim, replacing any previous value of the same type.
    pub fn with_claim(mut self, claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        self.claims.insert(claim_type.into(), value.into());
        self
    }

    pub fn claim(&self, claim_type: &str) -> Option<&str> {
        self.claims.get(claim_type).map(String::as_str)
    }

    pub fn email(&self) -> Option<&str> {
        self.claim(EMAIL_CLAIM)
    }

    pub fn given_name(&self) -> Option<&str> {
        self.claim(GIVEN_NAME_CLAIM)
    }

    /// Returns the caller's policies, empty when the claim is absent.
    pub fn policies(&self) -> Vec<&str> {
        self.claim(POLICIES_CLAIM)
            .map(|p| p.split(';').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.id.is_nil()
    }
}

impl Default for ActingPrincipal {
    fn default() -> Self {
        Self::anonymous()
    }
}
