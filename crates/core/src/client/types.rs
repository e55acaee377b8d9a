use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered OAuth/OIDC client.
///
/// The identifier is the only thing the store looks at. Everything else is
/// protocol configuration that is persisted as one opaque payload and
/// overwritten wholesale on every store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub client_secrets: Vec<ClientSecret>,
    #[serde(default = "default_true")]
    pub require_client_secret: bool,
    #[serde(default)]
    pub allowed_grant_types: Vec<String>,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub post_logout_redirect_uris: Vec<String>,
    #[serde(default)]
    pub allowed_scopes: Vec<String>,
    #[serde(default = "default_true")]
    pub require_pkce: bool,
    #[serde(default)]
    pub allow_offline_access: bool,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime: u32,
    /// Authorization code lifetime in seconds.
    #[serde(default = "default_authorization_code_lifetime")]
    pub authorization_code_lifetime: u32,
    /// Absolute refresh token lifetime in seconds.
    #[serde(default = "default_refresh_token_lifetime")]
    pub absolute_refresh_token_lifetime: u32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_true() -> bool {
    true
}

fn default_access_token_lifetime() -> u32 {
    3_600
}

fn default_authorization_code_lifetime() -> u32 {
    300
}

fn default_refresh_token_lifetime() -> u32 {
    2_592_000
}

impl Client {
    /// Creates an enabled client with default lifetimes and no configuration.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: None,
            enabled: true,
            client_secrets: Vec::new(),
            require_client_secret: true,
            allowed_grant_types: Vec::new(),
            redirect_uris: Vec::new(),
            post_logout_redirect_uris: Vec::new(),
            allowed_scopes: Vec::new(),
            require_pkce: true,
            allow_offline_access: false,
            access_token_lifetime: default_access_token_lifetime(),
            authorization_code_lifetime: default_authorization_code_lifetime(),
            absolute_refresh_token_lifetime: default_refresh_token_lifetime(),
            properties: BTreeMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    /// Adds an allowed grant type (e.g. `authorization_code`).
    pub fn with_grant_type(mut self, grant_type: impl Into<String>) -> Self {
        self.allowed_grant_types.push(grant_type.into());
        self
    }

    /// Adds a redirect URI.
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.push(uri.into());
        self
    }

    /// Adds an allowed scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.allowed_scopes.push(scope.into());
        self
    }

    /// Adds a client secret.
    pub fn with_secret(mut self, secret: ClientSecret) -> Self {
        self.client_secrets.push(secret);
        self
    }
}

/// A client secret. The value is expected to be hashed by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecret {
    pub value: String,
    #[serde(default = "default_secret_type", rename = "type")]
    pub secret_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
}

fn default_secret_type() -> String {
    "SharedSecret".to_string()
}

impl ClientSecret {
    /// Creates a shared secret from an already hashed value.
    pub fn shared(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            secret_type: default_secret_type(),
            description: None,
            expiration: None,
        }
    }
}
