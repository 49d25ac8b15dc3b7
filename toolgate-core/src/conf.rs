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

//! Parsing of application configuration.

mod api_config;
mod backend_config;
mod breaker_config;
mod exchange_config;
mod metrics_config;
mod oidc_config;
mod resolver_config;
mod session_config;
mod upstream_config;

use config::Config;
use config::ConfigBuilder;
use config::Environment;
use config::File;
use config::builder::BuilderState;
use serde::Deserialize;
use serde::Serialize;

pub use self::api_config::ApiConfig;
pub use self::backend_config::BackendConfig;
pub use self::breaker_config::BreakerConfig;
pub use self::exchange_config::ExchangeConfig;
pub use self::metrics_config::MetricsConfig;
pub use self::oidc_config::OidcConfig;
pub use self::resolver_config::ResolverConfig;
pub use self::session_config::SessionConfig;
pub use self::upstream_config::UpstreamConfig;

/// Package name reported by Cargo at build time.
const CARGO_PKG_NAME: &str = env!("CARGO_PKG_NAME");
/// Package version reported by Cargo at build time.
const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Static trait for tracking implementations.
trait AppConfigDefaults {
    fn set_defaults<T: BuilderState>(
        config_builder: ConfigBuilder<T>,
        prefix: &str,
    ) -> ConfigBuilder<T>;
}

/**
Application configuration root.

The application name defaults to the Rust package name, but can be overridden
with the environment variable `APP_NAME`.

Configuration will be loaded from

1. the file `{application name}.json` in the current working directory.
2. environment variable overrides in the form
   `{APPLICATION_NAME}_MODULE_CONFIGKEYWITHOUTSPACES`
 */
#[derive(Debug, Deserialize, Serialize)]
pub struct AppConfig {
    /// Configuration of the exposed REST API.
    pub api: ApiConfig,
    /// Configuration for persistence backends.
    pub backend: BackendConfig,
    /// Configuration of the circuit breakers.
    pub breaker: BreakerConfig,
    /// Configuration of the RFC 8693 token exchange client.
    pub exchange: ExchangeConfig,
    /// Configuration for the application's metrics collection.
    pub metrics: MetricsConfig,
    /// Configuration of the trusted OIDC issuer.
    pub oidc: OidcConfig,
    /// Configuration of the access resolver.
    pub resolver: ResolverConfig,
    /// Configuration of browser sessions.
    pub session: SessionConfig,
    /// Configuration of upstream tool invocation.
    pub upstream: UpstreamConfig,

    /// Lower case application name. Ignored when loading configuration.
    #[serde(skip_deserializing)]
    app_name: String,
    /// Time of application startup in epoch microseconds
    #[serde(skip_deserializing)]
    startup_ts_micros: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new(CARGO_PKG_NAME, 0)
    }
}

impl AppConfig {
    /// The application name defaults to the Rust package name, but can be
    /// overridden with the environment variable `APP_NAME`.
    fn read_app_name_lowercase(cargo_pkg_name: &str) -> String {
        std::env::var("APP_NAME")
            .map_err(|e| {
                log::debug!(
                    "Environment variable APP_NAME: {e:?} -> Default app name '{cargo_pkg_name}' will be used."
                );
            })
            .ok()
            .map(|value| value.to_lowercase())
            .unwrap_or(cargo_pkg_name.to_owned())
    }

    /// Lower case application name.
    pub fn app_name_lowercase(&self) -> &str {
        &self.app_name
    }

    /// SemVer application version derived from the Rust package version.
    pub fn app_version(&self) -> &'static str {
        CARGO_PKG_VERSION
    }

    /// Time of application startup in epoch microseconds
    pub fn startup_ts_micros(&self) -> u64 {
        self.startup_ts_micros
    }

    /** Creates a new instance pre-populated with defaults, an optional
    configurations file and environment variable overrides.

    Use `env!("CARGO_PKG_NAME")` as `cargo_pkg_name`.
    */
    pub fn new(cargo_pkg_name: &str, startup_ts_micros: u64) -> Self {
        let app_name = Self::read_app_name_lowercase(cargo_pkg_name);
        let config_filename = app_name.to_owned() + ".json";
        let config_env_prefix = &app_name.to_uppercase();
        let mut config_builder = Config::builder();
        config_builder = ApiConfig::set_defaults(config_builder, "api");
        config_builder = BackendConfig::set_defaults(config_builder, "backend");
        config_builder = BreakerConfig::set_defaults(config_builder, "breaker");
        config_builder = ExchangeConfig::set_defaults(config_builder, "exchange");
        config_builder = MetricsConfig::set_defaults(config_builder, "metrics");
        config_builder = OidcConfig::set_defaults(config_builder, "oidc");
        config_builder = ResolverConfig::set_defaults(config_builder, "resolver");
        config_builder = SessionConfig::set_defaults(config_builder, "session");
        config_builder = UpstreamConfig::set_defaults(config_builder, "upstream");
        let conf_file = std::env::current_dir().unwrap().join(config_filename);
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Will load '{}' configuration if present.",
                conf_file.display()
            );
        }
        let config = config_builder
            .add_source(File::with_name(conf_file.as_os_str().to_str().unwrap()).required(false))
            .add_source(
                Environment::with_prefix(config_env_prefix)
                    .separator("_")
                    .list_separator(","),
            )
            .build()
            .unwrap();
        let mut app_config: AppConfig = config.try_deserialize().unwrap();
        app_config.app_name = app_name;
        app_config.startup_ts_micros = startup_ts_micros;
        log::info!("Running with configuration: {app_config:?}");
        app_config
    }
}
