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

//! API resources for tool group curation.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use crate::rest_api::common::request_identity;
use actix_web::Error;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::delete;
use actix_web::get;
use actix_web::http::StatusCode;
use actix_web::patch;
use actix_web::post;
use actix_web::web::Data;
use actix_web::web::Json;
use actix_web::web::Path;
use serde::Deserialize;
use serde_json::json;
use toolgate_store::model::ToolSelector;
use utoipa::ToSchema;

/// Creation request of a new tool group.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    /// Human readable unique name.
    name: String,
    /// Declarative membership rules. All must match.
    #[serde(default)]
    selectors: Vec<ToolSelector>,
    /// Explicitly included tool identifiers.
    #[serde(default)]
    explicit_tool_ids: Vec<String>,
    /// Tool identifiers removed from membership regardless of selectors.
    #[serde(default)]
    excluded_tool_ids: Vec<String>,
}

/// Partial update of a tool group.
///
/// Each present field maps to one group command; absent fields are left
/// untouched.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PatchGroupRequest {
    /// Replace the group name.
    name: Option<String>,
    /// Atomically replace the selector set.
    selectors: Option<Vec<ToolSelector>>,
    /// Append one selector.
    add_selector: Option<ToolSelector>,
    /// Remove one selector.
    remove_selector: Option<ToolSelector>,
    /// Explicitly add one tool.
    add_explicit_tool_id: Option<String>,
    /// Remove one explicitly added tool.
    remove_explicit_tool_id: Option<String>,
    /// Exclude one tool from membership.
    exclude_tool_id: Option<String>,
    /// Lift one tool exclusion.
    include_tool_id: Option<String>,
    /// Transition the lifecycle status: `active` or `inactive`.
    status: Option<String>,
}

/// Create a new tool group.
///
/// A new group starts inactive; activate it to make it grantable.
#[utoipa::path(
    tag = "tool_groups",
    request_body = CreateGroupRequest,
    responses(
        (status = 201, description = "Created. Returning the group identifier.", content_type = "application/json"),
        (status = 400, description = "Bad Request."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
    ),
    security(("bearer_auth" = [])),
)]
#[post("/tool-groups")]
pub async fn create_tool_group(
    app_state: Data<AppState>,
    request: Json<CreateGroupRequest>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let request = request.into_inner();
    let group_id = app_state
        .gateway
        .create_tool_group(
            &identity,
            &request.name,
            &request.selectors,
            &request.explicit_tool_ids,
            &request.excluded_tool_ids,
        )
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::build(StatusCode::CREATED).json(json!({ "id": group_id })))
}

/// List tool groups.
#[utoipa::path(
    tag = "tool_groups",
    responses(
        (status = 200, description = "Ok.", content_type = "application/json"),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
    ),
    security(("bearer_auth" = [])),
)]
#[get("/tool-groups")]
pub async fn list_tool_groups(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let groups = app_state
        .gateway
        .groups_list(&identity)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::Ok().json(groups))
}

/// Apply a partial update to a tool group.
#[utoipa::path(
    tag = "tool_groups",
    params(("group_id", description = "Group identifier.")),
    request_body = PatchGroupRequest,
    responses(
        (status = 200, description = "Ok. All requested changes were applied."),
        (status = 400, description = "Bad Request."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 404, description = "Not Found."),
    ),
    security(("bearer_auth" = [])),
)]
#[patch("/tool-groups/{group_id}")]
pub async fn patch_tool_group(
    app_state: Data<AppState>,
    path: Path<String>,
    request: Json<PatchGroupRequest>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let group_id = path.into_inner();
    let request = request.into_inner();
    let gateway = &app_state.gateway;
    if request.name.is_some() || request.selectors.is_some() {
        gateway
            .update_tool_group(
                &identity,
                &group_id,
                request.name.as_deref(),
                request.selectors.as_deref(),
            )
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    if let Some(selector) = &request.add_selector {
        gateway
            .add_selector(&identity, &group_id, selector)
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    if let Some(selector) = &request.remove_selector {
        gateway
            .remove_selector(&identity, &group_id, selector)
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    if let Some(tool_id) = &request.add_explicit_tool_id {
        gateway
            .add_explicit_tool(&identity, &group_id, tool_id)
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    if let Some(tool_id) = &request.remove_explicit_tool_id {
        gateway
            .remove_explicit_tool(&identity, &group_id, tool_id)
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    if let Some(tool_id) = &request.exclude_tool_id {
        gateway
            .exclude_tool(&identity, &group_id, tool_id)
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    if let Some(tool_id) = &request.include_tool_id {
        gateway
            .include_tool(&identity, &group_id, tool_id)
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    match request.status.as_deref() {
        Some("active") => {
            gateway
                .activate_group(&identity, &group_id)
                .await
                .map_err(ApiErrorMapper::from_gateway_error)?;
        }
        Some("inactive") => {
            gateway
                .deactivate_group(&identity, &group_id)
                .await
                .map_err(ApiErrorMapper::from_gateway_error)?;
        }
        Some(other) => {
            return Err(ApiErrorMapper::from_gateway_error(
                toolgate_core::GatewayErrorKind::Validation
                    .error_with_msg(format!("Unknown group status '{other}'.")),
            ));
        }
        None => {}
    }
    Ok(HttpResponse::Ok().finish())
}

/// Delete a tool group.
#[utoipa::path(
    tag = "tool_groups",
    params(("group_id", description = "Group identifier.")),
    responses(
        (status = 204, description = "No content. Group was deleted."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 404, description = "Not Found."),
    ),
    security(("bearer_auth" = [])),
)]
#[delete("/tool-groups/{group_id}")]
pub async fn delete_tool_group(
    app_state: Data<AppState>,
    path: Path<String>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let group_id = path.into_inner();
    app_state
        .gateway
        .delete_group(&identity, &group_id)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::NoContent().finish())
}
