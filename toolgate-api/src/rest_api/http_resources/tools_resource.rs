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

//! API resources for tool discovery and execution.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use crate::rest_api::common::request_identity;
use actix_web::Error;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::get;
use actix_web::post;
use actix_web::web::Data;
use actix_web::web::Json;
use actix_web::web::Path;
use actix_web::web::Query;
use serde::Deserialize;
use serde_json::json;
use toolgate_core::gateway::ToolsFilter;
use utoipa::ToSchema;

/// Filters and pagination of the tool listing.
#[derive(Debug, Deserialize)]
pub struct ToolsQuery {
    /// Only tools of this source.
    source_id: Option<String>,
    /// Only tools carrying this tag.
    tag: Option<String>,
    /// Only tools with this enabled flag.
    enabled: Option<bool>,
    /// 1-based page number.
    page: Option<usize>,
    /// Page size, capped at 200.
    page_size: Option<usize>,
}

/// Execution request of one tool.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ExecuteToolRequest {
    /// Arguments keyed by parameter name; the request body goes under the
    /// reserved `body` key.
    arguments: serde_json::Value,
}

/// List normalized tools with filters and pagination.
#[utoipa::path(
    tag = "tools",
    params(
        ("source_id" = Option<String>, Query, description = "Only tools of this source."),
        ("tag" = Option<String>, Query, description = "Only tools carrying this tag."),
        ("enabled" = Option<bool>, Query, description = "Only tools with this enabled flag."),
        ("page" = Option<usize>, Query, description = "1-based page number."),
        ("page_size" = Option<usize>, Query, description = "Page size, capped at 200."),
    ),
    responses(
        (status = 200, description = "Ok. Returning items and total.", content_type = "application/json"),
        (status = 401, description = "Unauthorized: Authentication failure."),
    ),
    security(("bearer_auth" = [])),
)]
#[get("/tools")]
pub async fn list_tools(
    app_state: Data<AppState>,
    query: Query<ToolsQuery>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let _identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let query = query.into_inner();
    let page = app_state
        .gateway
        .tools_page(
            &ToolsFilter {
                source_id: query.source_id,
                tag: query.tag,
                enabled: query.enabled,
            },
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(50),
        )
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::Ok().json(json!({ "items": page.items, "total": page.total })))
}

/// Re-enable a soft-disabled tool.
#[utoipa::path(
    tag = "tools",
    params(("tool_id", description = "Tool identifier ({source_id}/{operation_id}).")),
    responses(
        (status = 204, description = "No content. Tool is enabled."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 404, description = "Not Found."),
    ),
    security(("bearer_auth" = [])),
)]
#[post("/tools/{tool_id:.*}/enable")]
pub async fn enable_tool(
    app_state: Data<AppState>,
    path: Path<String>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let tool_id = path.into_inner();
    app_state
        .gateway
        .enable_tool(&identity, &tool_id)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Soft-disable a tool. The flag survives inventory refreshes.
#[utoipa::path(
    tag = "tools",
    params(("tool_id", description = "Tool identifier ({source_id}/{operation_id}).")),
    responses(
        (status = 204, description = "No content. Tool is disabled."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 404, description = "Not Found."),
    ),
    security(("bearer_auth" = [])),
)]
#[post("/tools/{tool_id:.*}/disable")]
pub async fn disable_tool(
    app_state: Data<AppState>,
    path: Path<String>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let tool_id = path.into_inner();
    app_state
        .gateway
        .disable_tool(&identity, &tool_id)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Execute a tool on behalf of the authenticated agent.
///
/// The upstream response body is proxied back; the upstream status code is
/// carried in the `X-Upstream-Status` header.
#[utoipa::path(
    tag = "tools",
    params(("tool_id", description = "Tool identifier ({source_id}/{operation_id}).")),
    request_body = ExecuteToolRequest,
    responses(
        (
            status = 200,
            description = "Ok. Proxied upstream response body.",
            headers(("X-Upstream-Status" = String, description = "Status code of the upstream response.")),
        ),
        (status = 400, description = "Bad Request: Arguments don't match the tool contract."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: The agent may not invoke this tool."),
        (status = 404, description = "Not Found."),
        (status = 502, description = "Bad Gateway: Upstream failure."),
        (status = 503, description = "Service Unavailable: Circuit breaker is open."),
    ),
    security(("bearer_auth" = [])),
)]
#[post("/tools/{tool_id:.*}/execute")]
pub async fn execute_tool(
    app_state: Data<AppState>,
    path: Path<String>,
    request: Json<ExecuteToolRequest>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let tool_id = path.into_inner();
    let reply = app_state
        .gateway
        .execute_tool(&identity, &tool_id, &request.into_inner().arguments)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let mut builder = HttpResponse::Ok();
    builder.insert_header(("X-Upstream-Status", reply.status.to_string()));
    if let Some(content_type) = &reply.content_type {
        builder.content_type(content_type.as_str());
    }
    Ok(builder.body(reply.body))
}

/// The tools the authenticated agent's claims resolve to.
#[utoipa::path(
    tag = "tools",
    responses(
        (status = 200, description = "Ok. Returning the resolved tools.", content_type = "application/json"),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 503, description = "Service Unavailable: Read model unavailable."),
    ),
    security(("bearer_auth" = [])),
)]
#[get("/agent/tools")]
pub async fn agent_tools(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let tools = app_state
        .gateway
        .agent_tools(&identity)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::Ok().json(json!({ "tools": tools })))
}
