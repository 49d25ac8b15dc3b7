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

//! Read-model document for a tool curation group.

use super::ToolSelector;
use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;

/// Tool group lifecycle status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    /// Group membership contributes to access resolution.
    Active,
    /// Group is ignored by the access resolver.
    Inactive,
}

/** Read-model projection of a curated tool bundle.

Membership is `(tools matching all selectors ∪ explicit_tool_ids) \
excluded_tool_ids`. The explicit and excluded sets are disjoint.
*/
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GroupDocument {
    /// Aggregate identifier (UUID v4 text).
    pub group_id: String,
    /// Human readable unique name.
    pub name: String,
    /// Declarative membership rules. All must match.
    pub selectors: Vec<ToolSelector>,
    /// Explicitly included tool identifiers.
    pub explicit_tool_ids: Vec<String>,
    /// Tool identifiers removed from membership regardless of selectors.
    pub excluded_tool_ids: Vec<String>,
    /// Lifecycle status.
    pub status: GroupStatus,
    /// Optimistic concurrency token (sequence of the last applied event).
    pub state_version: u64,
}
