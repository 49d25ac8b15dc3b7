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

//! RFC 8693 OAuth 2.0 Token Exchange client.

use super::breaker::CircuitBreakers;
use crossbeam_skiplist::SkipMap;
use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use std::sync::Arc;
use tokio::sync::Mutex;
use toolgate_store::StoreProvider;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::provider::facades::StoreProviderFacades;
use toolgate_store::time;

/// Tunables of the token exchange client.
#[derive(Clone, Debug)]
pub struct ExchangeSettings {
    /// Token endpoint URL of the exchange grant.
    pub token_url: String,
    /// OAuth client identifier authorized for the grant.
    pub client_id: String,
    /// OAuth client secret authorized for the grant.
    pub client_secret: String,
    /// Cached tokens are discarded this long before actual expiry.
    pub ttl_buffer_micros: u64,
    /// Request timeout.
    pub timeout_micros: u64,
}

/// Cached result of one exchange.
#[derive(Debug, Serialize, Deserialize)]
struct CachedExchange {
    access_token: String,
    expires_at_micros: u64,
}

/// Token endpoint success response, reduced to what the gateway uses.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    #[serde(default = "TokenEndpointResponse::default_expires_in")]
    expires_in: u64,
}

impl TokenEndpointResponse {
    fn default_expires_in() -> u64 {
        300
    }
}

/** RFC 8693 token exchange with response caching and request coalescing.

Results are cached by `(sha256(subject_token), audience, sorted scopes)` in
the cache backend. Concurrent misses for the same key collapse into a
single POST through a per-key lock. The exchange endpoint is guarded by the
process-wide `token_exchange` circuit breaker.
*/
pub struct TokenExchanger {
    settings: ExchangeSettings,
    http_client: reqwest::Client,
    store: Arc<StoreProvider>,
    breakers: Arc<CircuitBreakers>,
    inflight: SkipMap<String, Arc<Mutex<()>>>,
}

impl TokenExchanger {
    const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
    const SUBJECT_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

    /// Return a new instance.
    pub fn new(
        settings: ExchangeSettings,
        store: &Arc<StoreProvider>,
        breakers: &Arc<CircuitBreakers>,
    ) -> Arc<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
            .referer(false)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(core::time::Duration::from_micros(settings.timeout_micros))
            .build()
            .expect("Failed to construct token exchange HTTP client.");
        Arc::new(Self {
            settings,
            http_client,
            store: Arc::clone(store),
            breakers: Arc::clone(breakers),
            inflight: SkipMap::default(),
        })
    }

    /// Exchange the subject token for an audience-scoped access token.
    ///
    /// An empty `audience` bypasses the exchange entirely and returns the
    /// subject token verbatim (pass-through mode).
    pub async fn exchange(
        &self,
        subject_token: &str,
        audience: &str,
        scopes: &[String],
    ) -> Result<String, GatewayError> {
        if audience.is_empty() {
            if log::log_enabled!(log::Level::Trace) {
                log::trace!("Empty audience: forwarding subject token verbatim.");
            }
            return Ok(subject_token.to_owned());
        }
        let cache_key = Self::cache_key(subject_token, audience, scopes);
        if let Some(access_token) = self.cached_token(&cache_key).await {
            return Ok(access_token);
        }
        // Collapse concurrent misses for the same key into one POST.
        let key_lock = Arc::clone(
            self.inflight
                .get_or_insert_with(cache_key.to_owned(), Arc::default)
                .value(),
        );
        let result = {
            let _in_flight = key_lock.lock().await;
            if let Some(access_token) = self.cached_token(&cache_key).await {
                Ok(access_token)
            } else {
                self.exchange_uncached(subject_token, audience, scopes, &cache_key)
                    .await
            }
        };
        self.inflight.remove(&cache_key);
        result
    }

    /// Cache lookup honoring the TTL buffer.
    async fn cached_token(&self, cache_key: &str) -> Option<String> {
        let entry = self.store.cache_facade().kv_get(cache_key).await?;
        let cached = serde_json::from_str::<CachedExchange>(&entry).ok()?;
        let now = time::get_timestamp_micros();
        (now < cached
            .expires_at_micros
            .saturating_sub(self.settings.ttl_buffer_micros))
        .then_some(cached.access_token)
    }

    /// Perform the actual RFC 8693 POST behind the circuit breaker.
    async fn exchange_uncached(
        &self,
        subject_token: &str,
        audience: &str,
        scopes: &[String],
        cache_key: &str,
    ) -> Result<String, GatewayError> {
        let breaker = self.breakers.token_exchange_breaker();
        if !self.breakers.can_execute(&breaker).await {
            return Err(GatewayErrorKind::CircuitOpen
                .error_with_msg("Token exchange circuit breaker is open."));
        }
        let mut form = vec![
            ("grant_type", Self::GRANT_TYPE.to_owned()),
            ("subject_token", subject_token.to_owned()),
            ("subject_token_type", Self::SUBJECT_TOKEN_TYPE.to_owned()),
            ("audience", audience.to_owned()),
        ];
        if !scopes.is_empty() {
            form.push(("scope", scopes.join(" ")));
        }
        let response = self
            .http_client
            .post(&self.settings.token_url)
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(&form)
            .send()
            .await;
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.breakers
                    .record_outcome(&breaker, false, "transport error")
                    .await;
                return Err(GatewayErrorKind::UpstreamFailure
                    .error_with_msg(format!("Token exchange transport failure: {e}")));
            }
        };
        let status = response.status();
        if status.is_success() {
            let token_response = response
                .json::<TokenEndpointResponse>()
                .await
                .map_err(|e| {
                    GatewayErrorKind::UpstreamFailure
                        .error_with_msg(format!("Malformed token exchange response: {e}"))
                })?;
            self.breakers.record_outcome(&breaker, true, "ok").await;
            let expires_at_micros =
                time::get_timestamp_micros() + token_response.expires_in * 1_000_000;
            let cached = CachedExchange {
                access_token: token_response.access_token.to_owned(),
                expires_at_micros,
            };
            self.store
                .cache_facade()
                .kv_put(
                    cache_key,
                    &serde_json::to_string(&cached).unwrap_or_default(),
                    expires_at_micros,
                )
                .await;
            return Ok(token_response.access_token);
        }
        // Client errors are the caller's problem, not an endpoint outage.
        let counts_as_failure =
            status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS;
        if counts_as_failure {
            self.breakers
                .record_outcome(&breaker, false, &format!("http {}", status.as_u16()))
                .await;
        }
        Err(GatewayErrorKind::UpstreamFailure.error_with_msg(format!(
            "Token exchange rejected with HTTP {}.",
            status.as_u16()
        )))
    }

    /// Cache key of one `(subject_token, audience, scopes)` combination.
    fn cache_key(subject_token: &str, audience: &str, scopes: &[String]) -> String {
        let subject_hash = hex::encode(Sha256::digest(subject_token.as_bytes()));
        let mut sorted_scopes = scopes.to_vec();
        sorted_scopes.sort();
        format!("xch:{subject_hash}:{audience}:{}", sorted_scopes.join("+"))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::gateway::breaker::BreakerSettings;
    use toolgate_store_mem::InMemStoreProvider;

    async fn exchanger() -> (Arc<TokenExchanger>, Arc<StoreProvider>) {
        let provider = InMemStoreProvider::new().await;
        let store = Arc::new(provider.as_store_provider());
        let breakers = CircuitBreakers::new(
            &store,
            BreakerSettings {
                failure_threshold: 5,
                recovery_timeout_micros: 30_000_000,
                rolling_window_micros: 60_000_000,
            },
        );
        let exchanger = TokenExchanger::new(
            ExchangeSettings {
                // Unroutable on purpose: any network attempt in these tests
                // is a bug.
                token_url: "http://127.0.0.1:1/token".to_owned(),
                client_id: "toolgate-exchange".to_owned(),
                client_secret: "secret".to_owned(),
                ttl_buffer_micros: 60_000_000,
                timeout_micros: 100_000,
            },
            &store,
            &breakers,
        );
        (exchanger, store)
    }

    #[tokio::test]
    async fn empty_audience_is_pass_through() {
        let (exchanger, _store) = exchanger().await;
        let token = exchanger.exchange("subject-token", "", &[]).await.unwrap();
        assert_eq!(token, "subject-token");
    }

    #[tokio::test]
    async fn fresh_cache_entry_avoids_network() {
        let (exchanger, store) = exchanger().await;
        let key = TokenExchanger::cache_key("subject-token", "pizzeria-backend", &[]);
        let expires_at_micros = time::get_timestamp_micros() + 600_000_000;
        store
            .cache_facade()
            .kv_put(
                &key,
                &serde_json::to_string(&CachedExchange {
                    access_token: "cached-token".to_owned(),
                    expires_at_micros,
                })
                .unwrap(),
                expires_at_micros,
            )
            .await;
        let token = exchanger
            .exchange("subject-token", "pizzeria-backend", &[])
            .await
            .unwrap();
        assert_eq!(token, "cached-token");
    }

    #[tokio::test]
    async fn entry_inside_ttl_buffer_is_not_served() {
        let (exchanger, store) = exchanger().await;
        let key = TokenExchanger::cache_key("subject-token", "pizzeria-backend", &[]);
        // Expires within the 60 second buffer.
        let expires_at_micros = time::get_timestamp_micros() + 10_000_000;
        store
            .cache_facade()
            .kv_put(
                &key,
                &serde_json::to_string(&CachedExchange {
                    access_token: "cached-token".to_owned(),
                    expires_at_micros,
                })
                .unwrap(),
                expires_at_micros,
            )
            .await;
        // Miss falls through to the (unroutable) endpoint.
        let res = exchanger
            .exchange("subject-token", "pizzeria-backend", &[])
            .await;
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::UpstreamFailure);
    }

    #[tokio::test]
    async fn scope_order_does_not_change_the_cache_key() {
        let scopes_a = vec!["read".to_owned(), "write".to_owned()];
        let scopes_b = vec!["write".to_owned(), "read".to_owned()];
        assert_eq!(
            TokenExchanger::cache_key("t", "aud", &scopes_a),
            TokenExchanger::cache_key("t", "aud", &scopes_b)
        );
    }

    #[tokio::test]
    async fn open_breaker_short_circuits() {
        let (exchanger, _store) = exchanger().await;
        // Trip the exchange breaker through 5 transport failures.
        for _ in 0..5 {
            let res = exchanger.exchange("t", "aud", &[]).await;
            assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::UpstreamFailure);
        }
        let res = exchanger.exchange("t", "aud", &[]).await;
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::CircuitOpen);
    }
}
