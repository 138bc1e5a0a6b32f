//! OAuth/OIDC client configuration.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::EntityId;
use serde::{Deserialize, Serialize};

use crate::command::{Command, CreateCommand, RemoveCommand, UpdateCommand, Validation};
use crate::entity::Entity;

pub const GRANT_AUTHORIZATION_CODE: &str = "authorization_code";
pub const GRANT_IMPLICIT: &str = "implicit";
pub const GRANT_HYBRID: &str = "hybrid";
pub const GRANT_CLIENT_CREDENTIALS: &str = "client_credentials";
pub const GRANT_PASSWORD: &str = "password";
pub const GRANT_DEVICE_CODE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Grant types that never redirect a user agent back to the client.
const NON_INTERACTIVE_GRANTS: [&str; 3] = [GRANT_CLIENT_CREDENTIALS, GRANT_PASSWORD, GRANT_DEVICE_CODE];

/// Grant types that authenticate the client at the token endpoint.
const CONFIDENTIAL_GRANTS: [&str; 4] = [
    GRANT_AUTHORIZATION_CODE,
    GRANT_HYBRID,
    GRANT_CLIENT_CREDENTIALS,
    GRANT_PASSWORD,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TokenUsage {
    ReUse,
    #[default]
    OneTimeOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TokenExpiration {
    Sliding,
    #[default]
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccessTokenType {
    #[default]
    Jwt,
    Reference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSecret {
    pub value: String,
    #[serde(default = "default_secret_type")]
    pub secret_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

fn default_secret_type() -> String {
    "SharedSecret".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientClaim {
    #[serde(rename = "type")]
    pub claim_type: String,
    pub value: String,
}

/// Everything a client create or update carries.
///
/// Missing JSON fields take the usual IdentityServer defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub client_id: String,
    pub client_name: Option<String>,
    pub description: Option<String>,
    pub client_uri: Option<String>,
    pub logo_uri: Option<String>,
    pub enabled: bool,
    pub protocol_type: String,
    pub client_secrets: Vec<ClientSecret>,
    pub require_client_secret: bool,
    pub require_consent: bool,
    pub allow_remember_consent: bool,
    pub allowed_grant_types: Vec<String>,
    pub require_pkce: bool,
    pub allow_plain_text_pkce: bool,
    pub require_request_object: bool,
    pub allow_access_tokens_via_browser: bool,
    pub redirect_uris: Vec<String>,
    pub post_logout_redirect_uris: Vec<String>,
    pub front_channel_logout_uri: Option<String>,
    pub front_channel_logout_session_required: bool,
    pub back_channel_logout_uri: Option<String>,
    pub back_channel_logout_session_required: bool,
    pub allow_offline_access: bool,
    pub allowed_scopes: Vec<String>,
    pub allowed_cors_origins: Vec<String>,
    pub identity_token_lifetime: i32,
    pub access_token_lifetime: i32,
    pub authorization_code_lifetime: i32,
    pub absolute_refresh_token_lifetime: i32,
    pub sliding_refresh_token_lifetime: i32,
    pub device_code_lifetime: i32,
    pub consent_lifetime: Option<i32>,
    pub user_sso_lifetime: Option<i32>,
    pub refresh_token_usage: TokenUsage,
    pub refresh_token_expiration: TokenExpiration,
    pub update_access_token_claims_on_refresh: bool,
    pub access_token_type: AccessTokenType,
    pub enable_local_login: bool,
    pub identity_provider_restrictions: Vec<String>,
    pub include_jwt_id: bool,
    pub claims: Vec<ClientClaim>,
    pub always_send_client_claims: bool,
    pub client_claims_prefix: String,
    pub always_include_user_claims_in_id_token: bool,
    pub properties: BTreeMap<String, String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_name: None,
            description: None,
            client_uri: None,
            logo_uri: None,
            enabled: true,
            protocol_type: "oidc".to_string(),
            client_secrets: Vec::new(),
            require_client_secret: true,
            require_consent: false,
            allow_remember_consent: true,
            allowed_grant_types: Vec::new(),
            require_pkce: true,
            allow_plain_text_pkce: false,
            require_request_object: false,
            allow_access_tokens_via_browser: false,
            redirect_uris: Vec::new(),
            post_logout_redirect_uris: Vec::new(),
            front_channel_logout_uri: None,
            front_channel_logout_session_required: true,
            back_channel_logout_uri: None,
            back_channel_logout_session_required: true,
            allow_offline_access: false,
            allowed_scopes: Vec::new(),
            allowed_cors_origins: Vec::new(),
            identity_token_lifetime: 300,
            access_token_lifetime: 3600,
            authorization_code_lifetime: 300,
            absolute_refresh_token_lifetime: 2_592_000,
            sliding_refresh_token_lifetime: 1_296_000,
            device_code_lifetime: 300,
            consent_lifetime: None,
            user_sso_lifetime: None,
            refresh_token_usage: TokenUsage::default(),
            refresh_token_expiration: TokenExpiration::default(),
            update_access_token_claims_on_refresh: false,
            access_token_type: AccessTokenType::default(),
            enable_local_login: true,
            identity_provider_restrictions: Vec::new(),
            include_jwt_id: true,
            claims: Vec::new(),
            always_send_client_claims: false,
            client_claims_prefix: "client_".to_string(),
            always_include_user_claims_in_id_token: false,
            properties: BTreeMap::new(),
        }
    }
}

/// `scheme://host[...]` with no whitespace anywhere and a non-empty host.
fn is_absolute_uri(uri: &str) -> bool {
    if uri.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((scheme, rest)) = uri.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.rsplit('@').next().unwrap_or_default();
    let host = host.rsplit_once(':').map_or(host, |(h, _)| h);

    scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !host.is_empty()
}

impl ClientSettings {
    pub fn validate(&self) -> Validation {
        let mut v = Validation::new();

        if self.client_id.trim().is_empty() {
            v.fail("Client id is required");
        } else if self.client_id.chars().any(char::is_whitespace) {
            v.fail("Client id must not contain whitespace");
        }

        if self.allowed_grant_types.is_empty() {
            v.fail("At least one allowed grant type is required");
        }

        let interactive = self
            .allowed_grant_types
            .iter()
            .any(|g| !NON_INTERACTIVE_GRANTS.contains(&g.as_str()));
        if interactive && self.redirect_uris.is_empty() {
            v.fail("Redirect URIs are required for interactive grant types");
        }

        for uri in self.redirect_uris.iter().chain(&self.post_logout_redirect_uris) {
            v.ensure(is_absolute_uri(uri), format!("Redirect URI '{uri}' must be absolute"));
        }

        let lifetimes = [
            ("Identity token lifetime", self.identity_token_lifetime),
            ("Access token lifetime", self.access_token_lifetime),
            ("Authorization code lifetime", self.authorization_code_lifetime),
            ("Absolute refresh token lifetime", self.absolute_refresh_token_lifetime),
            ("Sliding refresh token lifetime", self.sliding_refresh_token_lifetime),
            ("Device code lifetime", self.device_code_lifetime),
        ];
        for (label, seconds) in lifetimes {
            v.ensure(seconds > 0, format!("{label} must be greater than zero"));
        }

        v.ensure(
            self.sliding_refresh_token_lifetime <= self.absolute_refresh_token_lifetime,
            "Sliding refresh token lifetime must not exceed the absolute lifetime",
        );

        let confidential = self
            .allowed_grant_types
            .iter()
            .any(|g| CONFIDENTIAL_GRANTS.contains(&g.as_str()));
        if self.require_client_secret && confidential && self.client_secrets.is_empty() {
            v.fail("A client secret is required for confidential grant types");
        }

        v
    }
}

/// A stored client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStore {
    pub id: EntityId,
    #[serde(flatten)]
    pub settings: ClientSettings,
}

impl Entity for ClientStore {
    const ENTITY_TYPE: &'static str = "ClientStore";

    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct CreateClientStoreCommand {
    pub settings: ClientSettings,
}

impl Command for CreateClientStoreCommand {
    const NAME: &'static str = "CreateClientStoreCommand";

    fn validate(&self) -> Validation {
        self.settings.validate()
    }
}

impl CreateCommand for CreateClientStoreCommand {
    type Entity = ClientStore;

    fn into_entity(self, id: EntityId) -> ClientStore {
        ClientStore {
            id,
            settings: self.settings,
        }
    }
}

/// Replaces every setting of an existing client.
#[derive(Debug, Clone)]
pub struct UpdateClientStoreCommand {
    pub id: EntityId,
    pub settings: ClientSettings,
}

impl Command for UpdateClientStoreCommand {
    const NAME: &'static str = "UpdateClientStoreCommand";

    fn target_id(&self) -> Option<EntityId> {
        Some(self.id)
    }

    fn validate(&self) -> Validation {
        self.settings.validate()
    }
}

impl UpdateCommand for UpdateClientStoreCommand {
    type Entity = ClientStore;

    fn apply_to(self, existing: ClientStore) -> ClientStore {
        ClientStore {
            id: existing.id,
            settings: self.settings,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RemoveClientStoreCommand {
    pub id: EntityId,
}

impl Command for RemoveClientStoreCommand {
    const NAME: &'static str = "RemoveClientStoreCommand";

    fn target_id(&self) -> Option<EntityId> {
        Some(self.id)
    }
}

impl RemoveCommand for RemoveClientStoreCommand {
    type Entity = ClientStore;
}
