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

//! Parsing of configuration for browser sessions.

use config::ConfigBuilder;
use config::builder::BuilderState;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for browser sessions established by the OIDC login flow.
#[derive(Debug, Deserialize, Serialize)]
pub struct SessionConfig {
    /// See [Self::cookie_name()].
    cookiename: String,
    /// See [Self::ttl_seconds()].
    ttlseconds: u64,
    /// See [Self::idle_warn_seconds()].
    idlewarnseconds: u64,
}

impl AppConfigDefaults for SessionConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> ConfigBuilder<T> {
        config_builder
            .set_default(prefix.to_string() + "." + "cookiename", "toolgate_session")
            .unwrap()
            .set_default(prefix.to_string() + "." + "ttlseconds", "28800")
            .unwrap()
            .set_default(prefix.to_string() + "." + "idlewarnseconds", "120")
            .unwrap()
    }
}

impl SessionConfig {
    /// Name of the session cookie.
    pub fn cookie_name(&self) -> &str {
        &self.cookiename
    }

    /// Session time to live. Defaults to 28800 seconds (8 hours).
    pub fn ttl_seconds(&self) -> u64 {
        self.ttlseconds
    }

    /// How long before expiry the UI should warn an idle user.
    /// Defaults to 120 seconds.
    pub fn idle_warn_seconds(&self) -> u64 {
        self.idlewarnseconds
    }
}
