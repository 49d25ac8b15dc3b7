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

//! Parsing of configuration for the circuit breakers.

use config::ConfigBuilder;
use config::builder::BuilderState;
use serde::{Deserialize, Serialize};

use super::AppConfigDefaults;

/// Configuration for the circuit breakers protecting the token exchange
/// endpoint and each upstream source.
#[derive(Debug, Deserialize, Serialize)]
pub struct BreakerConfig {
    /// See [Self::failure_threshold()].
    failurethreshold: u64,
    /// See [Self::recovery_timeout_seconds()].
    recoverytimeoutseconds: u64,
    /// See [Self::rolling_window_seconds()].
    rollingwindowseconds: u64,
}

impl AppConfigDefaults for BreakerConfig {
    /// Provide defaults for this part of the configuration
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> ConfigBuilder<T> {
        config_builder
            .set_default(prefix.to_string() + "." + "failurethreshold", "5")
            .unwrap()
            .set_default(prefix.to_string() + "." + "recoverytimeoutseconds", "30")
            .unwrap()
            .set_default(prefix.to_string() + "." + "rollingwindowseconds", "60")
            .unwrap()
    }
}

impl BreakerConfig {
    /// Failures inside the rolling window before the breaker opens.
    /// Defaults to 5.
    pub fn failure_threshold(&self) -> u64 {
        self.failurethreshold
    }

    /// How long an open breaker waits before allowing a probe request.
    /// Defaults to 30 seconds.
    pub fn recovery_timeout_seconds(&self) -> u64 {
        self.recoverytimeoutseconds
    }

    /// Length of the failure counting window. Defaults to 60 seconds.
    pub fn rolling_window_seconds(&self) -> u64 {
        self.rollingwindowseconds
    }
}
