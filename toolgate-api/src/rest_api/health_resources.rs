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

//! Health check resources for platform probes.

use crate::rest_api::AppState;
use actix_web::HttpResponse;
use actix_web::Responder;
use actix_web::get;
use actix_web::web::Data;
use serde_json::json;

/// Combined health overview.
#[utoipa::path(
    responses(
        (status = 200, description = "Ok. Returning all health indicators.", content_type = "application/json"),
    ),
)]
#[get("/health")]
pub async fn health(app_state: Data<AppState>) -> impl Responder {
    let gateway = &app_state.gateway;
    HttpResponse::Ok().json(json!({
        "started": gateway.is_health_started(),
        "ready": gateway.is_health_ready(),
        "live": gateway.is_health_live(),
    }))
}

/// Liveness probe. Failing this means the process should be restarted.
#[utoipa::path(
    responses(
        (status = 204, description = "No content. The app is live."),
        (status = 503, description = "Service unavailable. The app needs a restart."),
    ),
)]
#[get("/health/live")]
pub async fn health_live(app_state: Data<AppState>) -> impl Responder {
    if app_state.gateway.is_health_live() {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::ServiceUnavailable().finish()
    }
}

/// Readiness probe. Failing this means requests should not be routed here.
#[utoipa::path(
    responses(
        (status = 204, description = "No content. The app is ready."),
        (status = 503, description = "Service unavailable. The app is not ready."),
    ),
)]
#[get("/health/ready")]
pub async fn health_ready(app_state: Data<AppState>) -> impl Responder {
    if app_state.gateway.is_health_ready() {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::ServiceUnavailable().finish()
    }
}

/// Startup probe.
#[utoipa::path(
    responses(
        (status = 204, description = "No content. The app has started."),
        (status = 503, description = "Service unavailable. The app is still starting."),
    ),
)]
#[get("/health/started")]
pub async fn health_started(app_state: Data<AppState>) -> impl Responder {
    if app_state.gateway.is_health_started() {
        HttpResponse::NoContent().finish()
    } else {
        HttpResponse::ServiceUnavailable().finish()
    }
}
