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

//! Tools Provider gateway core.

pub mod auth {
    //! Identity and access resolution.

    mod access_resolver;
    mod agent_identity;
    mod claim_matching;
    mod resolver_cache;
    mod selector_matching;

    pub use self::access_resolver::AccessResolver;
    pub use self::access_resolver::ResolvedAccess;
    pub use self::agent_identity::AgentIdentity;
}
mod breaker;
mod command_support;
mod domain;
mod event_bus;
mod exchange;
mod group_operations;
mod gw_metrics;
mod invocation;
mod invoker;
mod normalizer;
mod policy_operations;
mod projector;
mod query_operations;
mod sessions;
mod source_operations;

pub use self::event_bus::BusEvent;
pub use self::invocation::ToolArguments;
pub use self::invoker::UpstreamReply;
pub use self::query_operations::DocumentPage;
pub use self::query_operations::ToolsFilter;
pub use self::sessions::SessionManager;
pub use self::sessions::SessionRecord;

use self::auth::AccessResolver;
use self::auth::AgentIdentity;
use self::breaker::BreakerSettings;
use self::breaker::CircuitBreakers;
use self::event_bus::EventBus;
use self::exchange::ExchangeSettings;
use self::exchange::TokenExchanger;
use self::gw_metrics::GatewayMetrics;
use self::invoker::UpstreamInvoker;
use self::projector::Projector;
use crate::conf::AppConfig;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use tokio::sync::broadcast;
use tokio::time::sleep;
use toolgate_store::StoreProvider;
use toolgate_store::model::BreakerSnapshot;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store_mem::InMemStoreProvider;

/** Tools Provider gateway.

Owns the event-sourced domain, the read-model projection, the access
resolver, the RFC 8693 token exchanger, per-dependency circuit breakers
and the live event fan-out. All HTTP resources delegate here.
*/
pub struct Gateway {
    /// Thread safe boolean used to indicate application readiness.
    health_ready: AtomicBool,
    /// The store provider.
    store: Arc<StoreProvider>,
    /// Circuit breakers guarding token exchange and upstream sources.
    breakers: Arc<CircuitBreakers>,
    /// RFC 8693 token exchange client.
    exchanger: Arc<TokenExchanger>,
    /// Upstream HTTP execution.
    invoker: Arc<UpstreamInvoker>,
    /// Claims-to-tools access resolution.
    resolver: Arc<AccessResolver>,
    /// Journal to read model projection.
    projector: Arc<Projector>,
    /// Fan-out of journal events to live subscribers.
    event_bus: Arc<EventBus>,
    /// Browser session bookkeeping.
    sessions: Arc<SessionManager>,
    /// Client for fetching OpenAPI documents.
    spec_client: reqwest::Client,
    /// Metrics
    metrics: Option<Arc<GatewayMetrics>>,
}

impl Gateway {
    /// Return a new instance.
    pub async fn new(app_config: &Arc<AppConfig>) -> Arc<Self> {
        // Setup persistence from config.
        let store = match app_config.backend.implementation() {
            "mem" => {
                let inmem_provider = InMemStoreProvider::new().await;
                Arc::new(inmem_provider.as_store_provider())
            }
            unknown_provider => panic!("Unknown store provider type '{unknown_provider}'."),
        };
        let breakers = CircuitBreakers::new(
            &store,
            BreakerSettings {
                failure_threshold: app_config.breaker.failure_threshold(),
                recovery_timeout_micros: app_config.breaker.recovery_timeout_seconds() * 1_000_000,
                rolling_window_micros: app_config.breaker.rolling_window_seconds() * 1_000_000,
            },
        );
        let token_url = if app_config.exchange.token_url().is_empty() {
            // Default to the issuer's conventional token endpoint.
            format!(
                "{}/protocol/openid-connect/token",
                app_config.oidc.issuer()
            )
        } else {
            app_config.exchange.token_url().to_owned()
        };
        let exchanger = TokenExchanger::new(
            ExchangeSettings {
                token_url,
                client_id: app_config.exchange.client_id().to_owned(),
                client_secret: app_config.exchange.client_secret().to_owned(),
                ttl_buffer_micros: app_config.exchange.cache_ttl_buffer_seconds() * 1_000_000,
                timeout_micros: app_config.exchange.timeout_seconds() * 1_000_000,
            },
            &store,
            &breakers,
        );
        let invoker = UpstreamInvoker::new(app_config.upstream.timeout_seconds() * 1_000_000);
        let resolver = AccessResolver::new(
            &store,
            app_config.resolver.cache_ttl_seconds() * 1_000_000,
        )
        .await;
        let projector = Projector::new(&store).await;
        let event_bus = EventBus::new(&store).await;
        let sessions = SessionManager::new(&store, app_config.session.ttl_seconds() * 1_000_000);
        let spec_client = reqwest::ClientBuilder::new()
            .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
            .referer(false)
            .timeout(core::time::Duration::from_secs(30))
            .build()
            .expect("Failed to construct OpenAPI fetch client.");
        let metrics = app_config
            .metrics
            .enabled()
            .then(|| GatewayMetrics::new(app_config));
        log::info!("Gateway dependencies have been created.");
        Arc::new(Self {
            health_ready: AtomicBool::new(false),
            store,
            breakers,
            exchanger,
            invoker,
            resolver,
            projector,
            event_bus,
            sessions,
            spec_client,
            metrics,
        })
        .init()
    }

    /// Initialize
    fn init(self: Arc<Self>) -> Arc<Self> {
        let self_clone = Arc::clone(&self);
        tokio::spawn(async move { self_clone.post_init().await });
        self
    }

    /// Async tasks to perform after this [Gateway] has been started.
    async fn post_init(&self) {
        // Give the projector one poll cycle to replay any pre-existing
        // journal before serving queries.
        self.projector.await_caught_up().await;
        self.health_ready.store(true, Ordering::Relaxed);
        log::info!("Gateway is ready.");
    }

    /// Return `true` if the app has started.
    pub fn is_health_started(&self) -> bool {
        self.health_ready.load(Ordering::Relaxed)
    }

    /// Return `true` if the app is ready to receive requests.
    pub fn is_health_ready(&self) -> bool {
        self.health_ready.load(Ordering::Relaxed) && self.is_health_live()
    }

    /// Return `true` if the app is functioning as expected and `false` if it
    /// needs to be restarted.
    pub fn is_health_live(&self) -> bool {
        !self.projector.is_stalled()
    }

    /// Failsafe that terminates the application if it returns.
    ///
    /// This should kick in if the platform fails to orderly kill the
    /// application despite liveness health-check being raised.
    pub async fn liveness_failsafe(&self) -> Result<(), Box<dyn core::error::Error>> {
        let interval_micros = 10_000_000;
        let mut unhealth_duration = 0;
        loop {
            sleep(tokio::time::Duration::from_micros(interval_micros)).await;
            if self.is_health_live() {
                unhealth_duration = 0;
            } else {
                unhealth_duration += interval_micros;
            }
            if unhealth_duration > 60_000_000 {
                break;
            }
        }
        Err(Box::new(GatewayErrorKind::Unspecified.error_with_msg(
            "Liveness failsafe terminating app after an unrecoverable projection stall.",
        )) as Box<dyn core::error::Error>)
    }

    /// Invoked on graceful shutdowns to allow for some pre-emptive clean-up.
    ///
    /// This is not guaranteed to run, so no code can rely on this clean-up to
    /// have happened.
    pub async fn exit_hook(&self) {
        self.event_bus.announce_shutdown();
        // Leave the fan-out a moment to flush the shutdown event.
        sleep(tokio::time::Duration::from_micros(250_000)).await;
    }

    /// Browser session bookkeeping.
    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Subscribe to the live event stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<BusEvent> {
        self.event_bus.subscribe()
    }

    /// Resolve the tools the identity's claims grant access to.
    pub async fn resolved_access(
        &self,
        identity: &AgentIdentity,
    ) -> Result<Arc<auth::ResolvedAccess>, GatewayError> {
        self.resolver.resolve(identity.claims()).await
    }

    /// Point-in-time view of all circuit breakers.
    pub fn circuit_breakers(
        &self,
        identity: &AgentIdentity,
    ) -> Result<Vec<BreakerSnapshot>, GatewayError> {
        self.assert_admin(identity)?;
        Ok(self.breakers.snapshots())
    }

    /// Operator initiated reset of a circuit breaker to `closed`.
    pub async fn reset_circuit_breaker(
        &self,
        identity: &AgentIdentity,
        circuit_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        self.breakers
            .reset(circuit_id, identity.identity_string())
            .await
    }

    /// Error out with [GatewayErrorKind::Unauthorized] unless the identity
    /// carries the administrative role.
    pub fn assert_admin(&self, identity: &AgentIdentity) -> Result<(), GatewayError> {
        if identity.is_admin() {
            Ok(())
        } else {
            let msg = format!(
                "Identity '{identity}' is not authorized for administrative operations."
            );
            log::info!("{msg}");
            Err(GatewayErrorKind::Unauthorized.error_with_msg(msg))
        }
    }
}

#[cfg(test)]
mod test {
    use super::domain::SourceAggregate;
    use super::query_operations::ToolsFilter;
    use super::*;
    use serde_json::json;
    use toolgate_store::provider::facades::StoreProviderFacades;
    use toolgate_store::model::AuthMode;
    use toolgate_store::model::ClaimMatcher;
    use toolgate_store::model::MatcherOp;
    use toolgate_store::model::ParameterLocation;
    use toolgate_store::model::SelectorKind;
    use toolgate_store::model::ToolDocument;
    use toolgate_store::model::ToolParameter;
    use toolgate_store::model::ToolSelector;

    pub fn initialize_env_logger() {
        env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init()
            .map_err(|e| {
                log::trace!("Env logger for testing was probably already initialized: {e:?}")
            })
            .ok();
    }

    fn identity_with_roles(subject: &str, roles: &[&str]) -> AgentIdentity {
        AgentIdentity::from_bearer_token_claims(
            json!({
                "iss": "https://idp.example.com/realms/toolgate",
                "sub": subject,
                "realm_access": { "roles": roles },
            }),
            &format!("raw-token-{subject}"),
            "toolgate-admin",
        )
        .unwrap()
    }

    fn admin() -> AgentIdentity {
        identity_with_roles("admin-1", &["toolgate-admin"])
    }

    fn customer() -> AgentIdentity {
        identity_with_roles("customer-1", &["customer"])
    }

    async fn gateway() -> Arc<Gateway> {
        initialize_env_logger();
        let app_config = Arc::new(AppConfig::default());
        Gateway::new(&app_config).await
    }

    fn menu_tool(source_id: &str) -> ToolDocument {
        ToolDocument {
            tool_id: ToolDocument::tool_id_from(source_id, "get_menu_items_api_menu_get"),
            source_id: source_id.to_owned(),
            operation_id: "get_menu_items_api_menu_get".to_owned(),
            http_method: "GET".to_owned(),
            path_template: "/api/menu".to_owned(),
            summary: Some("Get menu items".to_owned()),
            tags: vec!["menu".to_owned()],
            parameters: vec![ToolParameter {
                name: "limit".to_owned(),
                location: ParameterLocation::Query,
                required: false,
                schema_type: "integer".to_owned(),
            }],
            request_body_schema: None,
            response_schemas: Default::default(),
            enabled: true,
            state_version: 0,
        }
    }

    /// Seed an inventory without the network fetch of a real refresh.
    async fn seed_inventory(gateway: &Arc<Gateway>, source_id: &str) {
        let tools = vec![menu_tool(source_id)];
        let correlation_id = uuid::Uuid::new_v4().to_string();
        gateway
            .handle_command(&SourceAggregate::stream_id(source_id), |events| {
                SourceAggregate::from_events(source_id, events).refresh_inventory(
                    tools.to_vec(),
                    // Unroutable on purpose: tests never reach an upstream.
                    Some("http://127.0.0.1:1"),
                    &correlation_id,
                )
            })
            .await
            .unwrap();
        gateway.invalidate_access_cache();
    }

    async fn granted_setup(gateway: &Arc<Gateway>) -> (String, String) {
        let source_id = gateway
            .register_source(
                &admin(),
                "Pizzeria",
                "http://127.0.0.1:1/openapi.json",
                &AuthMode::None,
                None,
            )
            .await
            .unwrap();
        seed_inventory(gateway, &source_id).await;
        let group_id = gateway
            .create_tool_group(
                &admin(),
                "menu tools",
                &[ToolSelector {
                    kind: SelectorKind::Source,
                    pattern: source_id.to_owned(),
                }],
                &[],
                &[],
            )
            .await
            .unwrap();
        gateway.activate_group(&admin(), &group_id).await.unwrap();
        let policy_id = gateway
            .define_access_policy(
                &admin(),
                "customers",
                &[ClaimMatcher {
                    claim_path: "realm_access.roles".to_owned(),
                    op: MatcherOp::Contains,
                    value: Some(json!("customer")),
                }],
                &[group_id],
                10,
            )
            .await
            .unwrap();
        gateway.activate_policy(&admin(), &policy_id).await.unwrap();
        (source_id, policy_id)
    }

    #[tokio::test]
    async fn register_and_unregister_leave_no_tools_behind() {
        let gateway = gateway().await;
        let (source_id, _) = granted_setup(&gateway).await;
        let page = gateway
            .tools_page(
                &ToolsFilter {
                    source_id: Some(source_id.to_owned()),
                    ..Default::default()
                },
                1,
                50,
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        gateway
            .unregister_source(&admin(), &source_id)
            .await
            .unwrap();
        let page = gateway
            .tools_page(
                &ToolsFilter {
                    source_id: Some(source_id),
                    ..Default::default()
                },
                1,
                50,
            )
            .await
            .unwrap();
        assert_eq!(page.total, 0);
        assert!(gateway.sources_list(&admin()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_admin_commands_are_rejected() {
        let gateway = gateway().await;
        let res = gateway
            .register_source(
                &customer(),
                "Pizzeria",
                "http://127.0.0.1:1/openapi.json",
                &AuthMode::None,
                None,
            )
            .await;
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::Unauthorized);
    }

    #[tokio::test]
    async fn resolved_access_drives_discovery_and_execution() {
        let gateway = gateway().await;
        let (source_id, _) = granted_setup(&gateway).await;
        let tool_id = ToolDocument::tool_id_from(&source_id, "get_menu_items_api_menu_get");
        // The matching agent discovers the tool.
        let tools = gateway.agent_tools(&customer()).await.unwrap();
        assert_eq!(
            tools.iter().map(|tool| tool.tool_id.as_str()).collect::<Vec<_>>(),
            vec![tool_id.as_str()]
        );
        // A non-matching agent discovers nothing and may not invoke.
        let other = identity_with_roles("other-1", &["viewer"]);
        assert!(gateway.agent_tools(&other).await.unwrap().is_empty());
        let res = gateway.execute_tool(&other, &tool_id, &json!({})).await;
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::Unauthorized);
        // The authorized invocation passes all gates and fails only at the
        // unroutable upstream.
        let res = gateway.execute_tool(&customer(), &tool_id, &json!({})).await;
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::UpstreamFailure);
        // Unknown arguments are rejected before any network attempt.
        let res = gateway
            .execute_tool(&customer(), &tool_id, &json!({ "bogus": 1 }))
            .await;
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::Validation);
    }

    #[tokio::test]
    async fn repeated_upstream_failures_open_the_source_breaker() {
        let gateway = gateway().await;
        let (source_id, _) = granted_setup(&gateway).await;
        let tool_id = ToolDocument::tool_id_from(&source_id, "get_menu_items_api_menu_get");
        for _ in 0..5 {
            let res = gateway.execute_tool(&customer(), &tool_id, &json!({})).await;
            assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::UpstreamFailure);
        }
        let res = gateway.execute_tool(&customer(), &tool_id, &json!({})).await;
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::CircuitOpen);
        let snapshots = gateway.circuit_breakers(&admin()).unwrap();
        let snapshot = snapshots
            .iter()
            .find(|snapshot| snapshot.source_id.as_deref() == Some(source_id.as_str()))
            .unwrap();
        assert_eq!(snapshot.state, "open");
        // Operator reset closes it again.
        let circuit_id = snapshot.circuit_id.to_owned();
        gateway
            .reset_circuit_breaker(&admin(), &circuit_id)
            .await
            .unwrap();
        let snapshots = gateway.circuit_breakers(&admin()).unwrap();
        assert_eq!(
            snapshots
                .iter()
                .find(|snapshot| snapshot.circuit_id == circuit_id)
                .unwrap()
                .state,
            "closed"
        );
    }

    #[tokio::test]
    async fn define_then_delete_policy_restores_prior_access() {
        let gateway = gateway().await;
        let (_, _) = granted_setup(&gateway).await;
        let before = gateway.resolved_access(&customer()).await.unwrap();
        let policy_id = gateway
            .define_access_policy(&admin(), "temporary", &[], &[], 99)
            .await
            .unwrap();
        gateway.activate_policy(&admin(), &policy_id).await.unwrap();
        gateway.delete_policy(&admin(), &policy_id).await.unwrap();
        let after = gateway.resolved_access(&customer()).await.unwrap();
        assert_eq!(before.tool_ids, after.tool_ids);
        assert_eq!(before.policy_ids, after.policy_ids);
    }

    #[tokio::test]
    async fn orphan_cleanup_sweeps_sourceless_tools() {
        let gateway = gateway().await;
        let (source_id, _) = granted_setup(&gateway).await;
        // Plant an orphan directly in the read model.
        let orphan = menu_tool("gone-source");
        gateway
            .store
            .read_model_facade()
            .document_upsert(
                toolgate_store::COLLECTION_TOOLS,
                &orphan.tool_id,
                &serde_json::to_string(&orphan).unwrap(),
            )
            .await
            .unwrap();
        gateway.cleanup_orphaned_tools(&admin()).await.unwrap();
        let page = gateway.tools_page(&ToolsFilter::default(), 1, 50).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].source_id, source_id);
    }
}
