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

//! REST API server and resources.
//!
//! API types:
//!
//! 1. Authenticated JSON resources under `/api`.
//! 2. Server-sent event streams for live configuration updates.

mod http_resources {
    //! API resources

    pub mod auth_resource;
    pub mod breakers_resource;
    pub mod groups_resource;
    pub mod policies_resource;
    pub mod sources_resource;
    pub mod tools_resource;
}
mod common {
    //! Common REST API resources and utils.

    mod api_error_mapper;
    mod bearer_token_authentication_checker;
    mod oidc_flow;
    mod request_identity;
    mod utoipa_security_scheme_modifier;

    pub use api_error_mapper::*;
    pub use bearer_token_authentication_checker::*;
    pub use oidc_flow::*;
    pub use request_identity::*;
    pub use utoipa_security_scheme_modifier::*;
}
mod health_resources;
mod sse_resources {
    //! Server-sent event resources.
    //!
    //! Delivery is best-effort: a subscriber that cannot keep up is
    //! disconnected and re-fetches from the read model after reconnecting.

    pub mod admin_sse_resource;
    pub mod agent_sse_resource;

    mod sse_stream;

    pub use self::sse_stream::sse_response;
}

use self::common::BearerTokenAuthenticationChecker;
use self::common::OidcFlowClient;
use self::common::UtopiaSecuritySchemeModifier;
use actix_web::App;
use actix_web::HttpResponse;
use actix_web::HttpServer;
use actix_web::Responder;
use actix_web::get;
use actix_web::http::header::ContentType;
use actix_web::web;
use std::sync::Arc;
use toolgate_core::AppConfig;
use toolgate_core::Gateway;
use utoipa::OpenApi;

/// Number of parallel requests that can be served for each assigned CPU core.
const WORKERS_PER_CORE: usize = 1024;

/// Shared state between requests.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) gateway: Arc<Gateway>,
    pub(crate) auth: Arc<BearerTokenAuthenticationChecker>,
    pub(crate) oidc_flow: Arc<OidcFlowClient>,
    pub(crate) app_config: Arc<AppConfig>,
}

/// Run HTTP server.
pub async fn run_http_server(
    app_config: &Arc<AppConfig>,
    gateway: &Arc<Gateway>,
) -> Result<(), Box<dyn core::error::Error>> {
    let app_config = Arc::clone(app_config);
    let auth = BearerTokenAuthenticationChecker::new(&app_config.oidc).await?;
    let oidc_flow = OidcFlowClient::new(&app_config).await;
    let workers = std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1);
    let max_connections = WORKERS_PER_CORE * workers;
    log::info!(
        "API described by http://{}:{}/openapi.json allows {max_connections} concurrent connections.",
        &app_config.api.bind_address(),
        &app_config.api.bind_port(),
    );
    let app_state: AppState = AppState {
        gateway: Arc::clone(gateway),
        auth,
        oidc_flow,
        app_config: Arc::clone(&app_config),
    };
    let app_data = web::Data::<AppState>::new(app_state);

    HttpServer::new(move || {
        let scope = web::scope("/api")
            .service(get_openapi)
            .service(http_resources::sources_resource::register_source)
            .service(http_resources::sources_resource::list_sources)
            .service(http_resources::sources_resource::refresh_source_inventory)
            .service(http_resources::sources_resource::unregister_source)
            .service(http_resources::sources_resource::cleanup_orphaned_tools)
            .service(http_resources::tools_resource::list_tools)
            .service(http_resources::tools_resource::enable_tool)
            .service(http_resources::tools_resource::disable_tool)
            .service(http_resources::tools_resource::execute_tool)
            .service(http_resources::tools_resource::agent_tools)
            .service(http_resources::groups_resource::create_tool_group)
            .service(http_resources::groups_resource::list_tool_groups)
            .service(http_resources::groups_resource::patch_tool_group)
            .service(http_resources::groups_resource::delete_tool_group)
            .service(http_resources::policies_resource::define_policy)
            .service(http_resources::policies_resource::list_policies)
            .service(http_resources::policies_resource::patch_policy)
            .service(http_resources::policies_resource::delete_policy)
            .service(http_resources::breakers_resource::list_circuit_breakers)
            .service(http_resources::breakers_resource::reset_circuit_breaker)
            .service(http_resources::auth_resource::login)
            .service(http_resources::auth_resource::callback)
            .service(http_resources::auth_resource::refresh)
            .service(http_resources::auth_resource::logout)
            .service(http_resources::auth_resource::me)
            .service(http_resources::auth_resource::session_settings)
            .service(sse_resources::admin_sse_resource::admin_event_stream)
            .service(sse_resources::agent_sse_resource::agent_event_stream);
        App::new()
            .app_data(app_data.clone())
            .service(web::redirect("/openapi", "/api/openapi.json"))
            .service(web::redirect("/openapi.json", "/api/openapi.json"))
            .service(scope)
            .service(health_resources::health)
            .service(health_resources::health_live)
            .service(health_resources::health_ready)
            .service(health_resources::health_started)
            .service(toolgate_metrics::http_metrics_resource::metrics)
    })
    .workers(workers)
    .backlog(u32::try_from(max_connections / 2).unwrap()) // Default is 2048
    .worker_max_blocking_threads(max_connections)
    .max_connections(max_connections)
    .bind_auto_h2c((
        app_config.api.bind_address().to_owned(),
        app_config.api.bind_port(),
    ))?
    .disable_signals()
    .shutdown_timeout(5) // Default 30
    .run()
    .await?;
    Ok(())
}

/// Serve Open API documentation.
#[get("/openapi.json")]
async fn get_openapi() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(openapi_as_string())
}

/// Get the OpenAPI definition as a pretty JSON String.
pub fn openapi_as_string() -> String {
    #[derive(OpenApi)]
    #[openapi(
        // Use Cargo.toml as source for the "info" section
        modifiers(&UtopiaSecuritySchemeModifier),
        paths(
            http_resources::sources_resource::register_source,
            http_resources::sources_resource::list_sources,
            http_resources::sources_resource::refresh_source_inventory,
            http_resources::sources_resource::unregister_source,
            http_resources::sources_resource::cleanup_orphaned_tools,
            http_resources::tools_resource::list_tools,
            http_resources::tools_resource::enable_tool,
            http_resources::tools_resource::disable_tool,
            http_resources::tools_resource::execute_tool,
            http_resources::tools_resource::agent_tools,
            http_resources::groups_resource::create_tool_group,
            http_resources::groups_resource::list_tool_groups,
            http_resources::groups_resource::patch_tool_group,
            http_resources::groups_resource::delete_tool_group,
            http_resources::policies_resource::define_policy,
            http_resources::policies_resource::list_policies,
            http_resources::policies_resource::patch_policy,
            http_resources::policies_resource::delete_policy,
            http_resources::breakers_resource::list_circuit_breakers,
            http_resources::breakers_resource::reset_circuit_breaker,
            http_resources::auth_resource::login,
            http_resources::auth_resource::callback,
            http_resources::auth_resource::refresh,
            http_resources::auth_resource::logout,
            http_resources::auth_resource::me,
            http_resources::auth_resource::session_settings,
            sse_resources::admin_sse_resource::admin_event_stream,
            sse_resources::agent_sse_resource::agent_event_stream,
            health_resources::health,
            health_resources::health_live,
            health_resources::health_ready,
            health_resources::health_started,
            toolgate_metrics::http_metrics_resource::metrics,
        )
    )]
    struct ApiDoc;
    ApiDoc::openapi().to_pretty_json().unwrap()
}
