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

//! Point-in-time view of a circuit breaker.

use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;

/// The dependency class a circuit breaker protects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BreakerKind {
    /// The RFC 8693 token exchange endpoint.
    TokenExchange,
    /// One upstream source.
    Source,
}

/// Point-in-time view of a circuit breaker, as listed to operators.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct BreakerSnapshot {
    /// Breaker identifier.
    pub circuit_id: String,
    /// Protected dependency class.
    pub kind: BreakerKind,
    /// Protected source, for `kind = source`.
    pub source_id: Option<String>,
    /// Current state: `closed`, `open` or `half_open`.
    pub state: String,
    /// Failures observed inside the rolling window.
    pub failure_count: u64,
    /// RFC 3339 timestamp of when the breaker last opened.
    pub opened_at: Option<String>,
}
