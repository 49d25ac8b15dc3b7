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

//! API resources for circuit breaker administration.

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
use serde::Deserialize;
use utoipa::ToSchema;

/// Reset request of one circuit breaker.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetBreakerRequest {
    /// Breaker identifier.
    id: String,
}

/// Point-in-time view of all circuit breakers.
#[utoipa::path(
    tag = "circuit_breakers",
    responses(
        (status = 200, description = "Ok.", content_type = "application/json"),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
    ),
    security(("bearer_auth" = [])),
)]
#[get("/admin/circuit-breakers")]
pub async fn list_circuit_breakers(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let snapshots = app_state
        .gateway
        .circuit_breakers(&identity)
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::Ok().json(snapshots))
}

/// Reset a circuit breaker to `closed`, clearing its counters.
#[utoipa::path(
    tag = "circuit_breakers",
    request_body = ResetBreakerRequest,
    responses(
        (status = 200, description = "Ok. Breaker was reset."),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
        (status = 404, description = "Not Found."),
    ),
    security(("bearer_auth" = [])),
)]
#[post("/admin/circuit-breakers/reset")]
pub async fn reset_circuit_breaker(
    app_state: Data<AppState>,
    request: Json<ResetBreakerRequest>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    app_state
        .gateway
        .reset_circuit_breaker(&identity, &request.id)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    Ok(HttpResponse::Ok().finish())
}
