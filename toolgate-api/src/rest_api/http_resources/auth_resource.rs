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

//! API resources for the OIDC browser login flow and session management.

use crate::rest_api::AppState;
use crate::rest_api::common::ApiErrorMapper;
use actix_web::Error;
use actix_web::HttpRequest;
use actix_web::HttpResponse;
use actix_web::cookie::Cookie;
use actix_web::cookie::SameSite;
use actix_web::get;
use actix_web::http::StatusCode;
use actix_web::post;
use actix_web::web::Data;
use actix_web::web::Query;
use serde::Deserialize;
use serde_json::json;
use toolgate_core::GatewayErrorKind;

/// Name of the transient cookie carrying the OIDC `state` value.
const STATE_COOKIE: &str = "toolgate_oidc_state";

/// Callback query parameters of the authorization code flow.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Start the OIDC login flow with a redirect to the issuer.
#[utoipa::path(
    tag = "auth",
    responses(
        (status = 302, description = "Found. Redirecting to the authorization endpoint."),
        (status = 503, description = "Service Unavailable: Issuer unreachable."),
    ),
)]
#[get("/auth/login")]
pub async fn login(app_state: Data<AppState>) -> Result<HttpResponse, Error> {
    let state = uuid::Uuid::new_v4().to_string();
    let authorization_url = app_state
        .oidc_flow
        .authorization_url(&state)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let state_cookie = Cookie::build(STATE_COOKIE, state)
        .path("/api/auth")
        .http_only(true)
        .same_site(SameSite::Lax)
        .finish();
    Ok(HttpResponse::build(StatusCode::FOUND)
        .cookie(state_cookie)
        .insert_header(("Location", authorization_url))
        .finish())
}

/// Complete the OIDC login flow: exchange the code and establish a session.
#[utoipa::path(
    tag = "auth",
    params(
        ("code" = Option<String>, Query, description = "Authorization code."),
        ("state" = Option<String>, Query, description = "Anti-forgery state."),
    ),
    responses(
        (status = 302, description = "Found. Session established, redirecting to the UI."),
        (status = 400, description = "Bad Request: Missing code or state mismatch."),
        (status = 401, description = "Unauthorized: Token validation failed."),
    ),
)]
#[get("/auth/callback")]
pub async fn callback(
    app_state: Data<AppState>,
    query: Query<CallbackQuery>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner();
    if let Some(error) = &query.error {
        return Err(ApiErrorMapper::from_gateway_error(
            GatewayErrorKind::AuthenticationFailure
                .error_with_msg(format!("Issuer rejected the login: {error}")),
        ));
    }
    let code = query.code.as_deref().ok_or_else(|| {
        ApiErrorMapper::from_gateway_error(
            GatewayErrorKind::Validation.error_with_msg("Missing 'code' query parameter."),
        )
    })?;
    let expected_state = http_request
        .cookie(STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    if expected_state.as_deref() != query.state.as_deref() || expected_state.is_none() {
        return Err(ApiErrorMapper::from_gateway_error(
            GatewayErrorKind::AuthenticationFailure.error_with_msg("OIDC state mismatch."),
        ));
    }
    let token_set = app_state
        .oidc_flow
        .exchange_code(code)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    // The issuer's response is only trusted after signature validation.
    let identity = app_state
        .auth
        .identity_from_token(&token_set.access_token)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    let session = app_state
        .gateway
        .sessions()
        .create(
            &token_set.access_token,
            token_set.refresh_token.as_deref(),
            token_set.id_token.as_deref(),
            identity.claims().to_owned(),
        )
        .await;
    let session_cookie = Cookie::build(
        app_state.app_config.session.cookie_name().to_owned(),
        session.session_id,
    )
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .finish();
    let mut cleared_state = Cookie::build(STATE_COOKIE, "").path("/api/auth").finish();
    cleared_state.make_removal();
    Ok(HttpResponse::build(StatusCode::FOUND)
        .cookie(session_cookie)
        .cookie(cleared_state)
        .insert_header(("Location", "/"))
        .finish())
}

/// Refresh the session's tokens with the issuer's refresh grant.
#[utoipa::path(
    tag = "auth",
    responses(
        (status = 200, description = "Ok. Session tokens were refreshed."),
        (status = 401, description = "Unauthorized: No session or refresh rejected."),
    ),
)]
#[post("/auth/refresh")]
pub async fn refresh(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let session = session_of(&app_state, &http_request).await?;
    let refresh_token = session.refresh_token.as_deref().ok_or_else(|| {
        ApiErrorMapper::from_gateway_error(
            GatewayErrorKind::AuthenticationFailure
                .error_with_msg("Session has no refresh token."),
        )
    })?;
    let token_set = app_state
        .oidc_flow
        .refresh(refresh_token)
        .await
        .map_err(ApiErrorMapper::from_gateway_error)?;
    app_state
        .gateway
        .sessions()
        .update_tokens(
            &session.session_id,
            &token_set.access_token,
            token_set.refresh_token.as_deref(),
        )
        .await;
    Ok(HttpResponse::Ok().json(json!({ "refreshed": true })))
}

/// End the session.
#[utoipa::path(
    tag = "auth",
    responses(
        (status = 204, description = "No content. Session ended."),
    ),
)]
#[post("/auth/logout")]
pub async fn logout(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let cookie_name = app_state.app_config.session.cookie_name();
    if let Some(cookie) = http_request.cookie(cookie_name) {
        app_state.gateway.sessions().delete(cookie.value()).await;
    }
    let mut cleared = Cookie::build(cookie_name.to_owned(), "").path("/").finish();
    cleared.make_removal();
    Ok(HttpResponse::NoContent().cookie(cleared).finish())
}

/// User claims of the current session.
#[utoipa::path(
    tag = "auth",
    responses(
        (status = 200, description = "Ok. Returning the user claims.", content_type = "application/json"),
        (status = 401, description = "Unauthorized: No session."),
    ),
)]
#[get("/auth/me")]
pub async fn me(
    app_state: Data<AppState>,
    http_request: HttpRequest,
) -> Result<HttpResponse, Error> {
    let session = session_of(&app_state, &http_request).await?;
    Ok(HttpResponse::Ok().json(session.user_info))
}

/// Session settings the UI needs for cookie and idle handling.
#[utoipa::path(
    tag = "auth",
    responses(
        (status = 200, description = "Ok.", content_type = "application/json"),
    ),
)]
#[get("/auth/session-settings")]
pub async fn session_settings(app_state: Data<AppState>) -> Result<HttpResponse, Error> {
    let session_config = &app_state.app_config.session;
    Ok(HttpResponse::Ok().json(json!({
        "session_cookie_name": session_config.cookie_name(),
        "session_ttl_seconds": session_config.ttl_seconds(),
        "session_idle_warn_seconds": session_config.idle_warn_seconds(),
    })))
}

/// Load the unexpired session of the request's cookie.
async fn session_of(
    app_state: &AppState,
    http_request: &HttpRequest,
) -> Result<toolgate_core::gateway::SessionRecord, Error> {
    let cookie_name = app_state.app_config.session.cookie_name();
    let session_id = http_request
        .cookie(cookie_name)
        .map(|cookie| cookie.value().to_owned())
        .ok_or_else(|| {
            ApiErrorMapper::from_gateway_error(
                GatewayErrorKind::AuthenticationFailure.error_with_msg("Missing session cookie."),
            )
        })?;
    app_state
        .gateway
        .sessions()
        .by_id(&session_id)
        .await
        .ok_or_else(|| {
            ApiErrorMapper::from_gateway_error(
                GatewayErrorKind::AuthenticationFailure
                    .error_with_msg("Session expired or unknown."),
            )
        })
}
