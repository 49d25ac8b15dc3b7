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

//! Read-model document for a claim-driven access policy.

use super::ClaimMatcher;
use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;

/// Access policy lifecycle status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    /// Policy participates in access resolution.
    Active,
    /// Policy is ignored by the access resolver.
    Inactive,
}

/** Read-model projection of a claim-driven access rule.

An active policy with an empty matcher set matches all agents. Policies
are evaluated in `(priority desc, policy_id asc)` order.
*/
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct PolicyDocument {
    /// Aggregate identifier (UUID v4 text).
    pub policy_id: String,
    /// Human readable unique name.
    pub name: String,
    /// Claim predicates. All must match.
    pub matchers: Vec<ClaimMatcher>,
    /// Groups granted when the policy matches.
    pub group_ids: Vec<String>,
    /// Evaluation priority. Higher first; ties broken by id ascending.
    pub priority: i64,
    /// Lifecycle status.
    pub status: PolicyStatus,
    /// Optimistic concurrency token (sequence of the last applied event).
    pub state_version: u64,
}
