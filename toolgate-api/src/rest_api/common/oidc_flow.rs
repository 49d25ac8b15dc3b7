/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! OIDC authorization code flow against the configured issuer.

use crossbeam_skiplist::SkipMap;
use crossbeam_skiplist::map::Entry;
use serde::Deserialize;
use std::sync::Arc;
use toolgate_core::AppConfig;
use toolgate_core::GatewayError;
use toolgate_core::GatewayErrorKind;

/// Endpoints from the OIDC discovery document.
#[derive(Clone, Debug, Deserialize)]
struct DiscoveryDocument {
    authorization_endpoint: String,
    token_endpoint: String,
}

/// Tokens obtained from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenSet {
    /// Access token of the logged in user.
    pub access_token: String,
    /// Refresh token, when the issuer granted one.
    pub refresh_token: Option<String>,
    /// ID token.
    pub id_token: Option<String>,
}

/** Client of the OIDC authorization code flow.

The browser is redirected to the issuer's authorization endpoint; the
callback exchanges the code for tokens. Discovery endpoints are cached for
the process lifetime.
*/
pub struct OidcFlowClient {
    http_client: reqwest::Client,
    issuer: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    discovery_cache: SkipMap<(), Arc<DiscoveryDocument>>,
}

impl OidcFlowClient {
    /// Return a new instance.
    pub async fn new(app_config: &Arc<AppConfig>) -> Arc<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
            .referer(false)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(core::time::Duration::from_secs(10))
            .build()
            .expect("Failed to construct OIDC flow HTTP client.");
        Arc::new(Self {
            http_client,
            issuer: app_config.oidc.issuer().to_owned(),
            client_id: app_config.oidc.client_id().to_owned(),
            client_secret: app_config.oidc.client_secret().to_owned(),
            redirect_uri: format!("{}/api/auth/callback", app_config.api.public_base_url()),
            discovery_cache: SkipMap::default(),
        })
    }

    /// Build the authorization redirect URL for a login attempt.
    pub async fn authorization_url(&self, state: &str) -> Result<String, GatewayError> {
        let discovery = self.discovery().await?;
        let mut url = reqwest::Url::parse(&discovery.authorization_endpoint).map_err(|e| {
            GatewayErrorKind::Unspecified
                .error_with_msg(format!("Invalid authorization endpoint: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", "openid profile email")
            .append_pair("state", state);
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet, GatewayError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
        ])
        .await
    }

    /// Run a refresh grant.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, GatewayError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet, GatewayError> {
        let discovery = self.discovery().await?;
        let response = self
            .http_client
            .post(&discovery.token_endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| {
                GatewayErrorKind::Transient
                    .error_with_msg(format!("Token endpoint unreachable: {e}"))
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayErrorKind::AuthenticationFailure.error_with_msg(format!(
                "Token endpoint rejected the grant with HTTP {}.",
                status.as_u16()
            )));
        }
        response.json::<TokenSet>().await.map_err(|e| {
            GatewayErrorKind::Transient
                .error_with_msg(format!("Malformed token endpoint response: {e}"))
        })
    }

    /// Fetch (or serve the cached) discovery document.
    async fn discovery(&self) -> Result<Arc<DiscoveryDocument>, GatewayError> {
        if let Some(discovery) = self
            .discovery_cache
            .front()
            .as_ref()
            .map(Entry::value)
            .cloned()
        {
            return Ok(discovery);
        }
        let url = format!("{}/.well-known/openid-configuration", self.issuer);
        let discovery = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                GatewayErrorKind::Transient
                    .error_with_msg(format!("OIDC discovery unreachable: {e}"))
            })?
            .json::<DiscoveryDocument>()
            .await
            .map_err(|e| {
                GatewayErrorKind::Transient
                    .error_with_msg(format!("Malformed OIDC discovery document: {e}"))
            })?;
        let discovery = Arc::new(discovery);
        self.discovery_cache.insert((), Arc::clone(&discovery));
        Ok(discovery)
    }
}
