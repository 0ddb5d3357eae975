//! Broker session handling
//!
//! Picks a working access token (configured, then persisted), or trades a
//! login request token for a fresh one and persists it for the next run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::adapters::{KiteClient, UserProfile};
use crate::config::BrokerConfig;
use crate::error::{AutobuyError, Result};

/// Access token persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct SessionManager {
    api_secret: String,
    access_token: Option<String>,
    request_token: Option<String>,
    session_file: PathBuf,
}

impl SessionManager {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            api_secret: config.api_secret.clone(),
            access_token: non_empty(config.access_token.as_deref()),
            request_token: non_empty(config.request_token.as_deref()),
            session_file: config.session_file.clone(),
        }
    }

    /// Leave `client` holding a validated access token
    pub async fn establish(&self, client: &mut KiteClient) -> Result<UserProfile> {
        let mut candidates = Vec::new();
        if let Some(token) = &self.access_token {
            candidates.push((token.clone(), "configuration"));
        }
        if let Some(stored) = self.load_stored() {
            if Some(&stored.access_token) != self.access_token.as_ref() {
                candidates.push((stored.access_token, "session file"));
            }
        }

        for (token, source) in candidates {
            client.set_access_token(token);
            match client.profile().await {
                Ok(profile) => {
                    info!("Using valid token from {} for user: {}", source, profile.user_name);
                    return Ok(profile);
                }
                Err(e) => warn!("Token from {} failed validation: {}", source, e),
            }
        }

        let request_token = self.request_token.as_ref().ok_or_else(|| {
            AutobuyError::Auth("No request token available. Manual login required.".to_string())
        })?;

        info!("Generating access token from saved request token");
        let access_token = client
            .generate_session(request_token, &self.api_secret)
            .await?;
        client.set_access_token(access_token.clone());
        let profile = client.profile().await?;

        let stored = StoredSession {
            access_token,
            user_name: Some(profile.user_name.clone()),
            created_at: Utc::now(),
        };
        if let Err(e) = self.store(&stored) {
            // Token still works for this run
            warn!("Could not persist session to {}: {}", self.session_file.display(), e);
        }

        info!("Access token generated for user: {}", profile.user_name);
        Ok(profile)
    }

    pub fn load_stored(&self) -> Option<StoredSession> {
        let raw = std::fs::read_to_string(&self.session_file).ok()?;
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!("Ignoring unreadable session file {}: {}", self.session_file.display(), e);
                None
            }
        }
    }

    pub fn store(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.session_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.session_file, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
