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

//! Parsing of configuration for the RFC 8693 token exchange client.

use config::ConfigBuilder;
use config::builder::BuilderState;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for the RFC 8693 token exchange client.
#[derive(Debug, Deserialize, Serialize)]
pub struct ExchangeConfig {
    /// See [Self::token_url()].
    tokenurl: String,
    /// See [Self::client_id()].
    clientid: String,
    /// See [Self::client_secret()].
    clientsecret: String,
    /// See [Self::cache_ttl_buffer_seconds()].
    cachettlbufferseconds: u64,
    /// See [Self::timeout_seconds()].
    timeoutseconds: u64,
}

impl AppConfigDefaults for ExchangeConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> ConfigBuilder<T> {
        config_builder
            .set_default(prefix.to_string() + "." + "tokenurl", "")
            .unwrap()
            .set_default(prefix.to_string() + "." + "clientid", "toolgate-exchange")
            .unwrap()
            .set_default(prefix.to_string() + "." + "clientsecret", "")
            .unwrap()
            .set_default(prefix.to_string() + "." + "cachettlbufferseconds", "60")
            .unwrap()
            .set_default(prefix.to_string() + "." + "timeoutseconds", "10")
            .unwrap()
    }
}

impl ExchangeConfig {
    /// Token endpoint of the exchange grant. When empty, the OIDC issuer's
    /// token endpoint from discovery is used.
    pub fn token_url(&self) -> &str {
        &self.tokenurl
    }

    /// OAuth client identifier authorized for the exchange grant.
    pub fn client_id(&self) -> &str {
        &self.clientid
    }

    /// OAuth client secret authorized for the exchange grant.
    pub fn client_secret(&self) -> &str {
        &self.clientsecret
    }

    /// Cached exchanged tokens are discarded this long before their actual
    /// expiry. Defaults to 60 seconds.
    pub fn cache_ttl_buffer_seconds(&self) -> u64 {
        self.cachettlbufferseconds
    }

    /// Timeout of a token exchange request. Defaults to 10 seconds.
    pub fn timeout_seconds(&self) -> u64 {
        self.timeoutseconds
    }
}
