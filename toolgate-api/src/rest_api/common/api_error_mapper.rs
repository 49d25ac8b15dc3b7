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

//! Mapper of app errors to Actix-web [Error].

use actix_web::Error;
use actix_web::HttpResponse;
use actix_web::error;
use actix_web::http::StatusCode;
use serde_json::json;
pub use toolgate_core::GatewayError;
use toolgate_core::GatewayErrorKind;

/// Mapper of app errors to Actix-web [Error].
///
/// Responses are JSON `{"error":{"kind","message","detail?"}}`. 401 carries
/// `WWW-Authenticate`, 503 carries `Retry-After`.
pub struct ApiErrorMapper {}

impl ApiErrorMapper {
    /// Return REST API [Error] from [GatewayError].
    pub fn from_gateway_error<E: AsRef<GatewayError>>(e: E) -> Error {
        let e = e.as_ref();
        if log::log_enabled!(log::Level::Debug) {
            log::debug!("Will respond with error. kind: {} msg: {e:?}", e.kind());
        }
        let (status, kind) = match e.kind() {
            GatewayErrorKind::AuthenticationFailure => {
                (StatusCode::UNAUTHORIZED, "authentication_failure")
            }
            GatewayErrorKind::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized"),
            GatewayErrorKind::Validation => (StatusCode::BAD_REQUEST, "validation"),
            GatewayErrorKind::NotFound => (StatusCode::NOT_FOUND, "not_found"),
            GatewayErrorKind::ConcurrencyConflict => (StatusCode::CONFLICT, "conflict"),
            GatewayErrorKind::BusinessRule => (StatusCode::CONFLICT, "business_rule"),
            GatewayErrorKind::CircuitOpen => (StatusCode::SERVICE_UNAVAILABLE, "circuit_open"),
            GatewayErrorKind::UpstreamFailure => (StatusCode::BAD_GATEWAY, "upstream_failure"),
            GatewayErrorKind::Transient => (StatusCode::SERVICE_UNAVAILABLE, "transient"),
            GatewayErrorKind::SpecRejected => {
                (StatusCode::UNPROCESSABLE_ENTITY, "spec_rejected")
            }
            GatewayErrorKind::Unspecified => (StatusCode::INTERNAL_SERVER_ERROR, "unspecified"),
        };
        let message = e.message().unwrap_or("").to_owned();
        // Validation errors carry their violation list JSON-serialized in
        // the message; surface it machine-readable.
        let detail = (e.kind() == &GatewayErrorKind::Validation)
            .then(|| serde_json::from_str::<serde_json::Value>(&message).ok())
            .flatten();
        let mut body = json!({ "error": { "kind": kind, "message": message } });
        if let Some(detail) = detail {
            body["error"]["detail"] = detail;
        }
        let mut builder = HttpResponse::build(status);
        match e.kind() {
            GatewayErrorKind::AuthenticationFailure => {
                builder.insert_header((
                    "WWW-Authenticate",
                    format!(
                        "Bearer error=\"invalid_token\", error_description=\"{}\"",
                        message.replace('"', "'")
                    ),
                ));
            }
            GatewayErrorKind::CircuitOpen => {
                builder.insert_header(("Retry-After", "30"));
            }
            GatewayErrorKind::Transient => {
                builder.insert_header(("Retry-After", "5"));
            }
            _ => {}
        }
        let response = builder.json(body);
        error::InternalError::from_response(e.to_string(), response).into()
    }
}
