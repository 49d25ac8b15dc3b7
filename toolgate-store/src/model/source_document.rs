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

//! Read-model document for a registered upstream source.

use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;

/// How the gateway obtains a credential for upstream calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// No `Authorization` header is sent upstream.
    None,
    /// The caller's own bearer token is forwarded verbatim.
    BearerPassthrough,
    /// The caller's token is exchanged (RFC 8693) for an audience-scoped one.
    TokenExchange,
}

/// Upstream source lifecycle status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    /// The source is serving and its tools are discoverable.
    Active,
    /// The source is administratively disabled.
    Inactive,
    /// The last inventory refresh failed.
    Failed,
}

/// Read-model projection of a registered OpenAPI-exposing service.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SourceDocument {
    /// Aggregate identifier (UUID v4 text).
    pub source_id: String,
    /// Human readable unique name.
    pub name: String,
    /// Where the OpenAPI document is fetched from.
    pub spec_url: String,
    /// Base URL for tool execution. Taken from the OpenAPI `servers` entry
    /// during refresh; the spec URL origin is the fallback.
    pub base_url: Option<String>,
    /// Credential strategy for tool execution.
    pub auth_mode: AuthMode,
    /// Token exchange audience. Empty means pass-through.
    pub default_audience: Option<String>,
    /// Lifecycle status.
    pub status: SourceStatus,
    /// Incremented on every successful inventory refresh.
    pub inventory_version: u64,
    /// RFC 3339 timestamp of the last successful refresh.
    pub last_refreshed_at: Option<String>,
    /// Optimistic concurrency token (sequence of the last applied event).
    pub state_version: u64,
}
