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

//! Validate authentication with Bearer tokens.

mod jwks_cache;

use self::jwks_cache::JwksCache;
use actix_web::HttpRequest;
use actix_web::http::header::HeaderValue;
use crossbeam_skiplist::SkipMap;
use crossbeam_skiplist::map::Entry;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::TokenData;
use jsonwebtoken::Validation;
use jsonwebtoken::jwk::AlgorithmParameters;
use jsonwebtoken::jwk::JwkSet;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use toolgate_core::GatewayError;
use toolgate_core::GatewayErrorKind;
use toolgate_core::conf::OidcConfig;
use toolgate_core::gateway::auth::AgentIdentity;
use toolgate_store::time;

/// Validates authentication using Bearer tokens.
///
/// Token signatures are checked against the JWKS of the configured OIDC
/// issuer. Verified identities are cached by raw token until the token
/// expires.
pub struct BearerTokenAuthenticationChecker {
    identity_by_bearer_token: SkipMap<String, (u64, Arc<AgentIdentity>)>,
    jwks_cache: Arc<JwksCache>,
    audience: String,
    admin_role: String,
    clock_skew_seconds: u64,
}

impl BearerTokenAuthenticationChecker {
    const BEARER_TOKEN: &str = "Bearer";
    /// Accepted signature algorithms.
    const ALGORITHMS: [Algorithm; 4] = [
        Algorithm::RS256,
        Algorithm::RS384,
        Algorithm::RS512,
        Algorithm::ES256,
    ];

    /// Return a new instance.
    pub async fn new(
        oidc_config: &OidcConfig,
    ) -> Result<Arc<Self>, Box<dyn core::error::Error>> {
        let jwks_cache = JwksCache::new(
            oidc_config.issuer(),
            oidc_config.jwks_min_refresh_seconds(),
        )
        .await;
        Ok(Arc::new(Self {
            identity_by_bearer_token: SkipMap::default(),
            jwks_cache,
            audience: oidc_config.audience().to_owned(),
            admin_role: oidc_config.admin_role().to_owned(),
            clock_skew_seconds: oidc_config.clock_skew_seconds(),
        })
        .init()
        .await)
    }

    async fn init(self: Arc<Self>) -> Arc<Self> {
        let self_clone = Arc::clone(&self);
        tokio::spawn(async move { self_clone.purge_expired_cached_identities().await });
        self
    }

    /// Purge old and expired bearer tokens from cache.
    ///
    /// Validity is still verified on use and expired tokens in use are removed.
    async fn purge_expired_cached_identities(&self) {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_micros(60_000_000)).await;
            let now = time::get_timestamp_micros();
            for entry in self.identity_by_bearer_token.iter() {
                if entry.value().0 < now {
                    entry.remove();
                }
            }
        }
    }

    /// Return the verified identity of the request's bearer token.
    pub async fn identity_from_request(
        &self,
        http_request: &HttpRequest,
    ) -> Result<Arc<AgentIdentity>, GatewayError> {
        let authorization_header = http_request
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .map(HeaderValue::to_str)
            .map(|res| {
                res.map_err(|e| {
                    GatewayErrorKind::AuthenticationFailure
                        .error_with_msg(format!("Invalid 'Authorization' HTTP header: {e}"))
                })
            })
            .unwrap_or_else(|| {
                Err(GatewayErrorKind::AuthenticationFailure
                    .error_with_msg("Missing 'Authorization' HTTP header."))
            })?
            .trim();
        // Extract Bearer token
        let bearer_token = authorization_header
            .strip_prefix(Self::BEARER_TOKEN)
            .map(|s| s.trim_start_matches(':'))
            .ok_or_else(|| {
                GatewayErrorKind::AuthenticationFailure
                    .error_with_msg("Missing 'Authorization' HTTP header.")
            })?
            .trim();
        self.identity_from_token(bearer_token).await
    }

    /// Return the verified identity of a raw bearer token.
    pub async fn identity_from_token(
        &self,
        bearer_token: &str,
    ) -> Result<Arc<AgentIdentity>, GatewayError> {
        let now_micros = time::get_timestamp_micros();
        let mut delete_from_cache_on_fail = false;
        if let Some((expires_micros, identity)) = self
            .identity_by_bearer_token
            .get(bearer_token)
            .as_ref()
            .map(Entry::value)
        {
            if expires_micros < &now_micros {
                delete_from_cache_on_fail = true;
            } else {
                return Ok(Arc::clone(identity));
            }
        }
        // Parse and validate JWT
        let (iss, jwks) = self.jwks_cache.get_iss_and_jwks()?;
        let token_data = self.validate_bearer_token(&iss, &jwks, bearer_token)?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("token_data: {token_data:?}");
        }
        let exp_seconds = token_data
            .claims
            .get("exp")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                GatewayErrorKind::AuthenticationFailure
                    .error_with_msg("Missing or non-unsigned integer 'exp' in bearer token.")
            })?;
        let ret = Arc::new(
            AgentIdentity::from_bearer_token_claims(
                token_data.claims,
                bearer_token,
                &self.admin_role,
            )
            .inspect_err(|_e| {
                if delete_from_cache_on_fail {
                    self.identity_by_bearer_token.remove(bearer_token);
                }
            })?,
        );
        self.identity_by_bearer_token.insert(
            bearer_token.to_owned(),
            (exp_seconds * 1_000_000, Arc::clone(&ret)),
        );
        Ok(ret)
    }

    /// Validate the bearer token validity using the provided JSON Web Key set.
    fn validate_bearer_token(
        &self,
        iss: &str,
        jwks: &JwkSet,
        token: &str,
    ) -> Result<TokenData<Value>, GatewayError> {
        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            GatewayErrorKind::AuthenticationFailure
                .error_with_msg(format!("Failed to decode authorization token: {e}"))
        })?;
        if !Self::ALGORITHMS.contains(&header.alg) {
            return Err(GatewayErrorKind::AuthenticationFailure
                .error_with_msg(format!("Algorithm '{:?}' is not supported.", header.alg)));
        }
        let kid = header.kid.ok_or_else(|| {
            GatewayErrorKind::AuthenticationFailure
                .error_with_msg("Missing 'kid' in token header field")
        })?;
        let jwk = jwks.find(&kid).ok_or_else(|| {
            GatewayErrorKind::AuthenticationFailure
                .error_with_msg(format!("JWKS has no 'kid' with value '{kid}'."))
        })?;
        let decoding_key = match &jwk.algorithm {
            AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e)
                .map_err(|e| {
                    GatewayErrorKind::AuthenticationFailure.error_with_msg(format!(
                        "Failed to construct RSA key for bearer token validation: {e}"
                    ))
                })?,
            AlgorithmParameters::EllipticCurve(ec) => DecodingKey::from_ec_components(&ec.x, &ec.y)
                .map_err(|e| {
                    GatewayErrorKind::AuthenticationFailure.error_with_msg(format!(
                        "Failed to construct EC key for bearer token validation: {e}"
                    ))
                })?,
            unsupported => Err(GatewayErrorKind::AuthenticationFailure
                .error_with_msg(format!("Currently '{unsupported:?}' is not supported.")))?,
        };
        let validation = {
            let mut validation = Validation::new(header.alg);
            validation.set_audience(&[&self.audience]);
            validation.validate_exp = true;
            validation.validate_nbf = true;
            validation.validate_aud = true;
            validation.leeway = self.clock_skew_seconds;
            validation.iss = Some(HashSet::from_iter([iss.to_string()]));
            validation.required_spec_claims.insert("iss".to_string());
            validation
        };
        jsonwebtoken::decode::<Value>(token, &decoding_key, &validation).map_err(|e| {
            // Consumers drive re-login off this exact description.
            if matches!(
                e.kind(),
                jsonwebtoken::errors::ErrorKind::ExpiredSignature
            ) {
                GatewayErrorKind::AuthenticationFailure.error_with_msg("token expired")
            } else {
                GatewayErrorKind::AuthenticationFailure.error_with_msg(format!(
                    "Decode claims for bearer token validation failed: {e}"
                ))
            }
        })
    }
}
