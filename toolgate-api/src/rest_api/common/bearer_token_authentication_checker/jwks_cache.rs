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

//! JSON Web Key Set cache.

use crossbeam_skiplist::SkipMap;
use crossbeam_skiplist::map::Entry;
use jsonwebtoken::jwk::JwkSet;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use toolgate_core::GatewayError;
use toolgate_core::GatewayErrorKind;

/// The JSON Web Key Set
/// ([RFC 7517 5](https://www.rfc-editor.org/rfc/rfc7517#section-5)) of the
/// configured OIDC issuer, used to validate bearer tokens.
///
/// The set is reloaded in the background at the configured minimum refresh
/// interval. A failed reload keeps serving the last successfully loaded set
/// (stale-if-error).
pub struct JwksCache {
    issuer: String,
    min_refresh_seconds: u64,
    iss_and_jwks_cache: SkipMap<(), (String, Arc<JwkSet>)>,
}

impl JwksCache {
    /// Return a new instance.
    ///
    /// An unreachable issuer at startup is tolerated: requests fail with 401
    /// until the background reload succeeds.
    pub async fn new(issuer: &str, min_refresh_seconds: u64) -> Arc<Self> {
        let instance = Arc::new(Self {
            issuer: issuer.to_owned(),
            min_refresh_seconds: std::cmp::max(min_refresh_seconds, 60),
            iss_and_jwks_cache: SkipMap::default(),
        });
        match instance.retrieve_open_id_issuer_and_jwks().await {
            Ok((iss, jwks)) => {
                instance
                    .iss_and_jwks_cache
                    .insert((), (iss, Arc::new(jwks)));
            }
            Err(e) => {
                log::warn!(
                    "Failed initial JWKS load from issuer '{issuer}' (will keep retrying): {e}"
                );
            }
        }
        instance.init().await
    }

    async fn init(self: Arc<Self>) -> Arc<Self> {
        let self_clone = Arc::clone(&self);
        tokio::spawn(async move { self_clone.background_reload_of_jwks().await });
        self
    }

    /// Get cached `iss` and JWKS
    pub fn get_iss_and_jwks(&self) -> Result<(String, Arc<JwkSet>), GatewayError> {
        self.iss_and_jwks_cache
            .front()
            .as_ref()
            .map(Entry::value)
            .cloned()
            .ok_or_else(|| {
                GatewayErrorKind::AuthenticationFailure
                    .error_with_msg("Unable to get cached JWKS.")
            })
    }

    /// Background reloads of JWKS
    async fn background_reload_of_jwks(&self) {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_micros(
                self.min_refresh_seconds * 1_000_000,
            ))
            .await;
            match self.retrieve_open_id_issuer_and_jwks().await {
                Ok((iss, jwks)) => {
                    self.iss_and_jwks_cache.insert((), (iss, Arc::new(jwks)));
                }
                Err(e) => {
                    log::warn!(
                        "Failed to reload JWKS (last successfully loaded will be used still): {e}"
                    );
                }
            }
        }
    }

    /// Load issuer and JWKS from the OIDC discovery document.
    async fn retrieve_open_id_issuer_and_jwks(
        &self,
    ) -> Result<(String, JwkSet), Box<dyn core::error::Error>> {
        let client = Self::new_http_client()?;
        let openid_config_url = format!("{}/.well-known/openid-configuration", self.issuer);
        let openid_config = Self::http_get(&client, &openid_config_url).await?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("openid-configuration at '{openid_config_url}': {openid_config}");
        }
        let json_value = serde_json::from_str::<serde_json::Value>(&openid_config)?;
        // Parse out issuer
        let iss = Self::extract_string_from_json(&json_value, "/issuer")?;
        let jwks_uri = Self::extract_string_from_json(&json_value, "/jwks_uri")?;
        // Get jwks_uri
        let jwks = serde_json::from_str(&Self::http_get(&client, &jwks_uri).await?)?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Bearer tokens will be validated using issuer '{iss}'.");
        }
        Ok((iss, jwks))
    }

    /// Extract String value at JSON Pointer from document.
    fn extract_string_from_json(
        json_value: &Value,
        json_pointer: &str,
    ) -> Result<String, Box<dyn core::error::Error>> {
        Ok(json_value
            .pointer(json_pointer)
            .ok_or("Failed to extract '{json_pointer}' from {json_value}.")?
            .as_str()
            .ok_or("Failed to parse value of '{json_pointer}' from {json_value} as String.")
            .map(str::to_string)?)
    }

    /// Return a new REST API client for talking to the issuer.
    fn new_http_client() -> Result<Client, Box<dyn core::error::Error>> {
        let res = reqwest::ClientBuilder::new()
            .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
            .referer(false)
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(1)
            .timeout(core::time::Duration::from_secs(10))
            .build()?;
        Ok(res)
    }

    /// Make request to the issuer using client.
    async fn http_get(client: &Client, url: &str) -> Result<String, Box<dyn core::error::Error>> {
        let response = client.get(url).send().await?;
        if response.status() == reqwest::StatusCode::OK {
            let content = response.text().await?;
            if log::log_enabled!(log::Level::Trace) {
                log::trace!("'{url}' -> '{content}'");
            }
            Ok(content)
        } else {
            Err(format!("Get '{url}' failed: {response:?}").as_str().into())
        }
    }
}
