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

//! Identity extraction from a request.

use crate::rest_api::AppState;
use actix_web::HttpRequest;
use std::sync::Arc;
use toolgate_core::GatewayError;
use toolgate_core::GatewayErrorKind;
use toolgate_core::gateway::auth::AgentIdentity;

/// Return the verified identity of a request.
///
/// A bearer `Authorization` header wins; without one the session cookie's
/// access token is validated instead.
pub async fn request_identity(
    app_state: &AppState,
    http_request: &HttpRequest,
) -> Result<Arc<AgentIdentity>, GatewayError> {
    if http_request
        .headers()
        .contains_key(actix_web::http::header::AUTHORIZATION)
    {
        return app_state.auth.identity_from_request(http_request).await;
    }
    let cookie_name = app_state.app_config.session.cookie_name();
    let session_id = http_request
        .cookie(cookie_name)
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(|| {
            GatewayErrorKind::AuthenticationFailure
                .error_with_msg("Missing 'Authorization' HTTP header.")
        })?;
    let session = app_state
        .gateway
        .sessions()
        .by_id(&session_id)
        .await
        .ok_or_else(|| {
            GatewayErrorKind::AuthenticationFailure.error_with_msg("Session expired or unknown.")
        })?;
    app_state
        .auth
        .identity_from_token(&session.access_token)
        .await
}
