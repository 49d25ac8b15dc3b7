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

//! API resources for upstream source administration.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use crate::rest_api::common::request_identity;
use actix_web::Error;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::delete;
use actix_web::get;
use actix_web::http::StatusCode;
use actix_web::post;
use actix_web::web::Data;
use actix_web::web::Json;
use actix_web::web::Path;
use serde::Deserialize;
use serde_json::json;
use toolgate_store::model::AuthMode;
use utoipa::ToSchema;

/// Registration request of a new upstream source.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterSourceRequest {
    /// Human readable unique name.
    name: String,
    /// Where the OpenAPI document is fetched from.
    spec_url: String,
    /// Credential strategy for tool execution.
    auth_mode: AuthMode,
    /// Token exchange audience. Empty means pass-through.
    default_audience: Option<String>,
}

/// Register a new upstream source.
///
/// The inventory stays empty until the first refresh.
#[utoipa::path(
    tag = "sources",
    request_body = RegisterSourceRequest,
    responses(
        (status = 201, description = "Created. Returning the source identifier.", content_type = "application/json"),
        (status = 400, description = "Bad Request."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 409, description = "Conflict: A source with this name exists."),
        (status = 500, description = "Internal server error."),
    ),
    security(("bearer_auth" = [])),
)]
#[post("/sources")]
pub async fn register_source(
    app_state: Data<AppState>,
    request: Json<RegisterSourceRequest>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let request = request.into_inner();
    let source_id = app_state
        .gateway
        .register_source(
            &identity,
            &request.name,
            &request.spec_url,
            &request.auth_mode,
            request.default_audience.as_deref(),
        )
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::build(StatusCode::CREATED).json(json!({ "id": source_id })))
}

/// List registered sources.
#[utoipa::path(
    tag = "sources",
    responses(
        (status = 200, description = "Ok.", content_type = "application/json"),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
    ),
    security(("bearer_auth" = [])),
)]
#[get("/sources")]
pub async fn list_sources(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let sources = app_state
        .gateway
        .sources_list(&identity)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::Ok().json(sources))
}

/// Fetch, normalize and reconcile a source's OpenAPI inventory.
#[utoipa::path(
    tag = "sources",
    params(("source_id", description = "Source identifier.")),
    responses(
        (status = 202, description = "Accepted. Returning the new inventory version.", content_type = "application/json"),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 404, description = "Not Found."),
        (status = 422, description = "Unprocessable: The OpenAPI document was rejected."),
        (status = 502, description = "Bad Gateway: The OpenAPI document could not be fetched."),
    ),
    security(("bearer_auth" = [])),
)]
#[post("/sources/{source_id}/refresh")]
pub async fn refresh_source_inventory(
    app_state: Data<AppState>,
    path: Path<String>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let source_id = path.into_inner();
    let inventory_version = app_state
        .gateway
        .refresh_inventory(&identity, &source_id)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::build(StatusCode::ACCEPTED)
        .json(json!({ "inventory_version": inventory_version })))
}

/// Unregister a source. All of its tools go away with it.
#[utoipa::path(
    tag = "sources",
    params(("source_id", description = "Source identifier.")),
    responses(
        (status = 204, description = "No content. Source was unregistered."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 404, description = "Not Found."),
    ),
    security(("bearer_auth" = [])),
)]
#[delete("/sources/{source_id}")]
pub async fn unregister_source(
    app_state: Data<AppState>,
    path: Path<String>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let source_id = path.into_inner();
    app_state
        .gateway
        .unregister_source(&identity, &source_id)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Sweep tools whose source no longer exists from the read model.
#[utoipa::path(
    tag = "sources",
    responses(
        (status = 202, description = "Accepted. Cleanup was scheduled."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
    ),
    security(("bearer_auth" = [])),
)]
#[post("/sources/cleanup-orphaned-tools")]
pub async fn cleanup_orphaned_tools(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    app_state
        .gateway
        .cleanup_orphaned_tools(&identity)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::Accepted().finish())
}
