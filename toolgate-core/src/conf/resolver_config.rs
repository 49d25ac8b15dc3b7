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

//! Parsing of configuration for the access resolver.

use config::ConfigBuilder;
use config::builder::BuilderState;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for the access resolver.
#[derive(Debug, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// See [Self::cache_ttl_seconds()].
    cachettlseconds: u64,
}

impl AppConfigDefaults for ResolverConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> ConfigBuilder<T> {
        config_builder
            .set_default(prefix.to_string() + "." + "cachettlseconds", "60")
            .unwrap()
    }
}

impl ResolverConfig {
    /// How long a resolved tool set is served from cache for an unchanged
    /// claims fingerprint. Defaults to 60 seconds.
    pub fn cache_ttl_seconds(&self) -> u64 {
        self.cachettlseconds
    }
}
