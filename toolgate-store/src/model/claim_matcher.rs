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

//! Predicate over a token claim.

use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;

/// Comparison operator of a [ClaimMatcher].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatcherOp {
    /// Type-strict scalar equality.
    Eq,
    /// Type-strict scalar inequality. Holds for a missing claim.
    Ne,
    /// The claim value appears in the matcher's value list.
    In,
    /// The claim value does not appear in the matcher's value list.
    /// Holds for a missing claim.
    NotIn,
    /// Substring for string claims, membership for array claims.
    Contains,
    /// String prefix.
    Prefix,
    /// String suffix.
    Suffix,
    /// The claim path resolves to a non-null value.
    Exists,
}

/** Immutable predicate over a dotted claim path in a decoded token.

A policy matches an agent only if all of its matchers match. A missing
claim fails every operator except `ne` and `not_in`.
*/
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ClaimMatcher {
    /// Dotted path into the claims document, e.g. `realm_access.roles`.
    pub claim_path: String,
    /// Comparison operator.
    pub op: MatcherOp,
    /// Comparison value. Not used by `exists`.
    pub value: Option<serde_json::Value>,
}
