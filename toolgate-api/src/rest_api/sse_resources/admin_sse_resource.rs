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

//! Live event stream for administrators.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use crate::rest_api::common::request_identity;
use crate::rest_api::sse_resources::sse_response;
use actix_web::Error;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::get;
use actix_web::web::Data;

/// Live configuration and circuit breaker events for administrators.
///
/// There is no replay on reconnect; the read model is authoritative and
/// clients re-fetch after reconnecting.
#[utoipa::path(
    tag = "events",
    responses(
        (status = 200, description = "Ok. Streaming server-sent events.", content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized: Authentication failure."),
        (status = 403, description = "Forbidden: Authorization failure."),
    ),
    security(("bearer_auth" = [])),
)]
#[get("/admin/sse")]
pub async fn admin_event_stream(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let identity = request_identity(&app_state, &http_request)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    app_state
        .gateway
        .assert_admin(&identity)
        .map_err(ApiErrorMapper::from_gateway_error)?;
    log::info!("Admin '{identity}' opened an event stream.");
    Ok(sse_response(app_state.gateway.subscribe_events()))
}
