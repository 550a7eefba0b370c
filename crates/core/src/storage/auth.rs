use tracing::{debug, info, warn};

use crate::error::StorageError;

/// Environment variable holding a ready-made OAuth access token.
pub const TOKEN_ENV: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// OAuth scope requested from Application Default Credentials.
pub const READ_ONLY_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_only";

/// How requests to the bucket are authorised.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// OAuth2 bearer token.
    Bearer(String),
    /// No credentials; only works for publicly readable buckets.
    Anonymous,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Bearer(_) => f.write_str("Bearer(..)"),
            Credentials::Anonymous => f.write_str("Anonymous"),
        }
    }
}

/// Resolve credentials from the ambient environment.
///
/// Order: explicit token, `GOOGLE_OAUTH_ACCESS_TOKEN`, then Application
/// Default Credentials (`GOOGLE_APPLICATION_CREDENTIALS` key file, gcloud's
/// ADC file, the GCE metadata server, the gcloud CLI). Falls back to
/// anonymous access.
pub async fn discover(configured: Option<&str>) -> Credentials {
    if let Some(token) = non_empty(configured) {
        debug!("using configured access token");
        return Credentials::Bearer(token);
    }

    if let Some(token) = non_empty(std::env::var(TOKEN_ENV).ok().as_deref()) {
        debug!("using access token from {TOKEN_ENV}");
        return Credentials::Bearer(token);
    }

    match application_default_token().await {
        Ok(token) => {
            info!("using application default credentials");
            return Credentials::Bearer(token);
        }
        Err(err) => debug!("application default credentials unavailable: {err}"),
    }

    warn!("no Google Cloud credentials found, falling back to anonymous access");
    Credentials::Anonymous
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

async fn application_default_token() -> Result<String, StorageError> {
    let provider = gcp_auth::provider()
        .await
        .map_err(|err| StorageError::Auth(err.to_string()))?;
    let token = provider
        .token(&[READ_ONLY_SCOPE])
        .await
        .map_err(|err| StorageError::Auth(err.to_string()))?;
    non_empty(Some(token.as_str()))
        .ok_or_else(|| StorageError::Auth("token provider returned an empty token".to_string()))
}
