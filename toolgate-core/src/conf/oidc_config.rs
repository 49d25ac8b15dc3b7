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

//! Parsing of configuration for the trusted OIDC issuer.

use config::ConfigBuilder;
use config::builder::BuilderState;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for the trusted OIDC issuer.
#[derive(Debug, Deserialize, Serialize)]
pub struct OidcConfig {
    /// See [Self::issuer()].
    issuer: String,
    /// See [Self::audience()].
    audience: String,
    /// See [Self::client_id()].
    clientid: String,
    /// See [Self::client_secret()].
    clientsecret: String,
    /// See [Self::admin_role()].
    adminrole: String,
    /// See [Self::jwks_min_refresh_seconds()].
    jwksminrefreshseconds: u64,
    /// See [Self::clock_skew_seconds()].
    clockskewseconds: u64,
}

impl AppConfigDefaults for OidcConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> ConfigBuilder<T> {
        config_builder
            .set_default(
                prefix.to_string() + "." + "issuer",
                "http://localhost:8180/realms/toolgate",
            )
            .unwrap()
            .set_default(prefix.to_string() + "." + "audience", "toolgate")
            .unwrap()
            .set_default(prefix.to_string() + "." + "clientid", "toolgate")
            .unwrap()
            .set_default(prefix.to_string() + "." + "clientsecret", "")
            .unwrap()
            .set_default(prefix.to_string() + "." + "adminrole", "toolgate-admin")
            .unwrap()
            .set_default(prefix.to_string() + "." + "jwksminrefreshseconds", "300")
            .unwrap()
            .set_default(prefix.to_string() + "." + "clockskewseconds", "30")
            .unwrap()
    }
}

impl OidcConfig {
    /// Trusted token issuer (`iss`).
    pub fn issuer(&self) -> &str {
        self.issuer.trim_end_matches('/')
    }

    /// The required bearer token audience for API authentication.
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// OAuth client identifier used for the browser login flow.
    pub fn client_id(&self) -> &str {
        &self.clientid
    }

    /// OAuth client secret used for the browser login flow.
    pub fn client_secret(&self) -> &str {
        &self.clientsecret
    }

    /// Realm role that grants access to administrative resources.
    pub fn admin_role(&self) -> &str {
        &self.adminrole
    }

    /// Minimum interval between JWKS refreshes. Defaults to 300 seconds.
    pub fn jwks_min_refresh_seconds(&self) -> u64 {
        self.jwksminrefreshseconds
    }

    /// Tolerated clock skew for token time claims. Defaults to 30 seconds.
    pub fn clock_skew_seconds(&self) -> u64 {
        self.clockskewseconds
    }
}
