use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rspotify::{prelude::*, AuthCodeSpotify, Config, Credentials, OAuth};

use crate::config::SpotifyConfig;
use crate::model::Credential;

/// Lifetime assumed when Spotify does not report one
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Sign-in against Spotify's authorization-code flow
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// URL of Spotify's consent page. `state` comes back on the callback.
    fn authorize_url(&self, state: &str) -> Result<String>;

    /// Trade the callback `code` for a credential bound to the signed-in user.
    async fn exchange(&self, code: &str) -> Result<Credential>;
}

#[derive(Clone)]
pub struct SpotifyAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scopes: Vec<String>,
}

impl SpotifyAuth {
    pub fn new(config: &SpotifyConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scopes: config.scopes.clone(),
        }
    }

    fn client(&self, state: &str) -> AuthCodeSpotify {
        let oauth = OAuth {
            redirect_uri: self.redirect_uri.clone(),
            state: state.to_string(),
            scopes: self.scopes.iter().cloned().collect(),
            ..Default::default()
        };

        AuthCodeSpotify::with_config(
            Credentials::new(&self.client_id, &self.client_secret),
            oauth,
            Config {
                token_cached: false,
                token_refreshing: false,
                ..Default::default()
            },
        )
    }
}

#[async_trait]
impl Authenticator for SpotifyAuth {
    fn authorize_url(&self, state: &str) -> Result<String> {
        let url = self
            .client(state)
            .get_authorize_url(false)
            .context("Failed to build Spotify authorize URL")?;
        Ok(url)
    }

    async fn exchange(&self, code: &str) -> Result<Credential> {
        tracing::info!("Exchanging authorization code for access token");
        let spotify = self.client("");
        spotify
            .request_token(code)
            .await
            .context("Spotify token exchange failed")?;

        let token = spotify
            .token
            .lock()
            .await
            .map_err(|_| anyhow!("Spotify token lock unavailable"))?
            .clone()
            .ok_or_else(|| anyhow!("Spotify returned no token"))?;

        let user = spotify.me().await.context("Failed to fetch current user")?;
        tracing::info!(user_id = %user.id, "Spotify sign-in completed");

        Ok(Credential {
            access_token: token.access_token,
            expires_at: token.expires_at.unwrap_or_else(|| {
                Utc::now() + chrono::Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS)
            }),
            user_id: user.id.id().to_string(),
        })
    }
}
