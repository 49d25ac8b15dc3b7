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

//! Parsing of configuration for persistence backends.

use config::ConfigBuilder;
use config::builder::BuilderState;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for persistence backends.
///
/// The event journal, read model and cache are narrow interfaces with
/// pluggable implementations. The bundled `mem` provider keeps everything
/// in process memory.
#[derive(Debug, Deserialize, Serialize)]
pub struct BackendConfig {
    /// See [Self::implementation()].
    implementation: String,
    /// See [Self::journal_url()].
    journalurl: String,
    /// See [Self::read_model_url()].
    readmodelurl: String,
    /// See [Self::cache_url()].
    cacheurl: String,
}

impl AppConfigDefaults for BackendConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> ConfigBuilder<T> {
        config_builder
            .set_default(prefix.to_string() + "." + "implementation", "mem")
            .unwrap()
            .set_default(prefix.to_string() + "." + "journalurl", "")
            .unwrap()
            .set_default(prefix.to_string() + "." + "readmodelurl", "")
            .unwrap()
            .set_default(prefix.to_string() + "." + "cacheurl", "")
            .unwrap()
    }
}

impl BackendConfig {
    /// Store provider implementation selector. Defaults to `mem`.
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    /// Connection URL of an external event journal backend.
    pub fn journal_url(&self) -> &str {
        &self.journalurl
    }

    /// Connection URL of an external read model backend.
    pub fn read_model_url(&self) -> &str {
        &self.readmodelurl
    }

    /// Connection URL of an external session/cache backend.
    pub fn cache_url(&self) -> &str {
        &self.cacheurl
    }
}
