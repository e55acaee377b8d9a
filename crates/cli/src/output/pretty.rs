//! Pretty output formatting.

use chrono::{DateTime, SecondsFormat, Utc};
use grantstore_core::client::Client;
use grantstore_core::grant::PersistedGrant;

fn timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn list(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}

/// Format a client for display. Secret values are never printed.
pub fn format_client(client: &Client) -> String {
    let mut output = match &client.client_name {
        Some(name) => format!("{} ({})", name, client.client_id),
        None => client.client_id.clone(),
    };
    if !client.enabled {
        output.push_str(" [disabled]");
    }
    output.push_str(&format!(
        "\n  Grant types: {}\n  Scopes: {}\n  Redirect URIs: {}\n  Secrets: {}",
        list(&client.allowed_grant_types),
        list(&client.allowed_scopes),
        list(&client.redirect_uris),
        client.client_secrets.len()
    ));
    output
}

/// Format a grant for display. The payload is left out.
pub fn format_grant(grant: &PersistedGrant) -> String {
    let mut output = format!(
        "{} [{}]\n  Subject: {}\n  Client: {}\n  Created: {}",
        grant.key,
        grant.grant_type,
        grant.subject_id.as_deref().unwrap_or("-"),
        grant.client_id,
        timestamp(&grant.creation_time)
    );
    if let Some(expiration) = &grant.expiration {
        output.push_str(&format!("\n  Expires: {}", timestamp(expiration)));
    }
    output
}

/// Format grants for display.
pub fn format_grants(grants: &[PersistedGrant]) -> String {
    if grants.is_empty() {
        return "No grants found.".to_string();
    }
    let mut output = format!("GRANTS ({})\n", grants.len());
    output.push_str(&"-".repeat(40));
    for grant in grants {
        output.push_str(&format!("\n{}", format_grant(grant)));
        output.push('\n');
    }
    output
}
