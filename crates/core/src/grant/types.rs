use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of persisted grant.
///
/// The well-known kinds have their own variants; anything else a protocol
/// server invents is kept verbatim in [`GrantType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GrantType {
    AuthorizationCode,
    ReferenceToken,
    RefreshToken,
    UserConsent,
    DeviceCode,
    Other(String),
}

impl GrantType {
    /// Returns the wire name stored in the `type` attribute.
    pub fn as_str(&self) -> &str {
        match self {
            GrantType::AuthorizationCode => "authorization_code",
            GrantType::ReferenceToken => "reference_token",
            GrantType::RefreshToken => "refresh_token",
            GrantType::UserConsent => "user_consent",
            GrantType::DeviceCode => "device_code",
            GrantType::Other(name) => name,
        }
    }
}

impl From<&str> for GrantType {
    fn from(value: &str) -> Self {
        match value {
            "authorization_code" => GrantType::AuthorizationCode,
            "reference_token" => GrantType::ReferenceToken,
            "refresh_token" => GrantType::RefreshToken,
            "user_consent" => GrantType::UserConsent,
            "device_code" => GrantType::DeviceCode,
            other => GrantType::Other(other.to_string()),
        }
    }
}

impl From<String> for GrantType {
    fn from(value: String) -> Self {
        GrantType::from(value.as_str())
    }
}

impl From<GrantType> for String {
    fn from(value: GrantType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for GrantType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted grant: refresh token, authorization code, device code,
/// reference token or consent record.
///
/// `key` is unique across the whole store. `subject_id` is the partition the
/// grant lives in; a grant without a subject can still be stored and fetched
/// by key, but no subject-scoped read or revocation will ever see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedGrant {
    pub key: String,
    #[serde(rename = "type")]
    pub grant_type: GrantType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    pub client_id: String,
    pub creation_time: DateTime<Utc>,
    /// `None` means the grant never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
    /// Opaque serialized payload owned by the protocol server.
    pub data: String,
}

impl PersistedGrant {
    /// Creates a grant for a subject, created now, with no expiration.
    pub fn new(
        key: impl Into<String>,
        grant_type: GrantType,
        subject_id: impl Into<String>,
        client_id: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            grant_type,
            subject_id: Some(subject_id.into()),
            client_id: client_id.into(),
            creation_time: Utc::now(),
            expiration: None,
            data: data.into(),
        }
    }

    /// Sets the expiration timestamp.
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Sets the creation timestamp.
    pub fn with_creation_time(mut self, creation_time: DateTime<Utc>) -> Self {
        self.creation_time = creation_time;
        self
    }

    /// Detaches the grant from any subject.
    pub fn without_subject(mut self) -> Self {
        self.subject_id = None;
        self
    }

    /// Returns true if the grant has an expiration at or before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }
}
