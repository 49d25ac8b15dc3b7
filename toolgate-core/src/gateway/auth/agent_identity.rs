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

//! Verified agent identity.

use serde_json::Value;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;

/// An agent identity verified through bearer token authentication.
///
/// Carries the full decoded claims document for policy matching and the raw
/// token for pass-through and RFC 8693 exchange.
#[derive(Clone)]
pub struct AgentIdentity {
    claims: Value,
    raw_token: String,
    admin: bool,
    identity_string: String,
}

impl std::fmt::Display for AgentIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.identity_string())
    }
}

impl AgentIdentity {
    /// Return a new instance from validated bearer token claims.
    ///
    /// `admin_role` is checked against the `realm_access.roles` claim.
    pub fn from_bearer_token_claims(
        claims: Value,
        raw_token: &str,
        admin_role: &str,
    ) -> Result<Self, GatewayError> {
        let iss = Self::extract_claim("iss", &claims)?;
        let sub = Self::extract_claim("sub", &claims)?;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("Agent identity from bearer token. issuer: '{iss}', subject: '{sub}'");
        }
        let admin = claims
            .pointer("/realm_access/roles")
            .and_then(Value::as_array)
            .is_some_and(|roles| roles.iter().any(|role| role == admin_role));
        let iss = iss.replacen("://", "_", 1).replace(".", "_");
        let identity_string = format!("bearer;{iss};{sub}");
        Ok(Self {
            claims,
            raw_token: raw_token.to_owned(),
            admin,
            identity_string,
        })
    }

    /// Return the full decoded claims document.
    pub fn claims(&self) -> &Value {
        &self.claims
    }

    /// Return the raw bearer token the identity was derived from.
    pub fn raw_token(&self) -> &str {
        &self.raw_token
    }

    /// Return `true` when the agent carries the administrative realm role.
    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Return the identity in a format that can be used for matching.
    ///
    /// No two different identities should yield the same String.
    pub fn identity_string(&self) -> &str {
        &self.identity_string
    }

    /// Extract a claim from the validated claims document.
    fn extract_claim<'a>(claim: &str, claims: &'a Value) -> Result<&'a str, GatewayError> {
        claims.get(claim).and_then(Value::as_str).ok_or(
            GatewayErrorKind::AuthenticationFailure
                .error_with_msg(format!("Missing or non-string '{claim}' in bearer token.")),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn admin_role_is_detected() {
        let claims = json!({
            "iss": "https://idp.example.com/realms/toolgate",
            "sub": "agent-1",
            "realm_access": { "roles": ["toolgate-admin", "customer"] },
        });
        let identity =
            AgentIdentity::from_bearer_token_claims(claims, "raw", "toolgate-admin").unwrap();
        assert!(identity.is_admin());
        assert_eq!(
            identity.identity_string(),
            "bearer;https_idp_example_com/realms/toolgate;agent-1"
        );
    }

    #[test]
    fn missing_subject_is_rejected() {
        let claims = json!({ "iss": "https://idp.example.com" });
        assert!(AgentIdentity::from_bearer_token_claims(claims, "raw", "admin").is_err());
    }
}
