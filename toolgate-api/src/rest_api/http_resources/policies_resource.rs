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

//! API resources for access policy administration.

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
use toolgate_store::model::ClaimMatcher;
use utoipa::ToSchema;

/// Definition request of a new access policy.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DefinePolicyRequest {
    /// Human readable unique name.
    name: String,
    /// Claim predicates. All must match.
    #[serde(default)]
    matchers: Vec<ClaimMatcher>,
    /// Groups granted when the policy matches.
    #[serde(default)]
    group_ids: Vec<String>,
    /// Evaluation priority. Higher first.
    #[serde(default)]
    priority: i64,
}

/// Partial update of an access policy.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PatchPolicyRequest {
    /// Atomically replace the matcher set.
    matchers: Option<Vec<ClaimMatcher>>,
    /// Atomically replace the granted group set.
    group_ids: Option<Vec<String>>,
    /// Change the evaluation priority.
    priority: Option<i64>,
    /// Transition the lifecycle status: `active` or `inactive`.
    status: Option<String>,
}

/// Define a new access policy.
///
/// A defined policy starts inactive and grants nothing until activated.
#[utoipa::path(
    tag = "policies",
    request_body = DefinePolicyRequest,
    responses(
        (status = 201, description = "Created. Returning the policy identifier.", content_type = "application/json"),
        (status = 400, description = "Bad Request."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
    ),
    security(("bearer_auth" = [])),
)]
#[post("/policies")]
pub async fn define_policy(
    app_state: Data<AppState>,
    request: Json<DefinePolicyRequest>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let request = request.into_inner();
    let policy_id = app_state
        .gateway
        .define_access_policy(
            &identity,
            &request.name,
            &request.matchers,
            &request.group_ids,
            request.priority,
        )
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::build(StatusCode::CREATED).json(json!({ "id": policy_id })))
}

/// List access policies in evaluation order.
#[utoipa::path(
    tag = "policies",
    responses(
        (status = 200, description = "Ok. Sorted by (priority desc, id asc).", content_type = "application/json"),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
    ),
    security(("bearer_auth" = [])),
)]
#[get("/policies")]
pub async fn list_policies(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let policies = app_state
        .gateway
        .policies_list(&identity)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::Ok().json(policies))
}

/// Apply a partial update to an access policy.
#[utoipa::path(
    tag = "policies",
    params(("policy_id", description = "Policy identifier.")),
    request_body = PatchPolicyRequest,
    responses(
        (status = 200, description = "Ok. All requested changes were applied."),
        (status = 400, description = "Bad Request."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 404, description = "Not Found."),
    ),
    security(("bearer_auth" = [])),
)]
#[patch("/policies/{policy_id}")]
pub async fn patch_policy(
    app_state: Data<AppState>,
    path: Path<String>,
    request: Json<PatchPolicyRequest>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let policy_id = path.into_inner();
    let request = request.into_inner();
    let gateway = &app_state.gateway;
    if let Some(matchers) = &request.matchers {
        gateway
            .update_policy_matchers(&identity, &policy_id, matchers)
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    if let Some(group_ids) = &request.group_ids {
        gateway
            .update_policy_groups(&identity, &policy_id, group_ids)
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    if let Some(priority) = request.priority {
        gateway
            .change_policy_priority(&identity, &policy_id, priority)
            .await
            .map_err(ApiErrorMapper::from_gateway_error)?;
    }
    match request.status.as_deref() {
        Some("active") => {
            gateway
                .activate_policy(&identity, &policy_id)
                .await
                .map_err(ApiErrorMapper::from_gateway_error)?;
        }
        Some("inactive") => {
            gateway
                .deactivate_policy(&identity, &policy_id)
                .await
                .map_err(ApiErrorMapper::from_gateway_error)?;
        }
        Some(other) => {
            return Err(ApiErrorMapper::from_gateway_error(
                toolgate_core::GatewayErrorKind::Validation
                    .error_with_msg(format!("Unknown policy status '{other}'.")),
            ));
        }
        None => {}
    }
    Ok(HttpResponse::Ok().finish())
}

/// Delete an access policy.
#[utoipa::path(
    tag = "policies",
    params(("policy_id", description = "Policy identifier.")),
    responses(
        (status = 204, description = "No content. Policy was deleted."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 404, description = "Not Found."),
    ),
    security(("bearer_auth" = [])),
)]
#[delete("/policies/{policy_id}")]
pub async fn delete_policy(
    app_state: Data<AppState>,
    path: Path<String>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let policy_id = path.into_inner();
    app_state
        .gateway
        .delete_policy(&identity, &policy_id)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::NoContent().finish())
}
