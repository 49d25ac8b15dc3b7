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

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![doc = include_str!("../README.md")]

pub mod model {
    //! Shared gateway model objects.

    mod breaker_snapshot;
    mod claim_matcher;
    mod domain_event;
    mod gateway_error;
    mod group_document;
    mod policy_document;
    mod source_document;
    mod tool_document;
    mod tool_selector;

    pub use self::breaker_snapshot::BreakerKind;
    pub use self::breaker_snapshot::BreakerSnapshot;
    pub use self::claim_matcher::ClaimMatcher;
    pub use self::claim_matcher::MatcherOp;
    pub use self::domain_event::DomainEvent;
    pub use self::domain_event::PendingEvent;
    pub use self::gateway_error::GatewayError;
    pub use self::gateway_error::GatewayErrorKind;
    pub use self::group_document::GroupDocument;
    pub use self::group_document::GroupStatus;
    pub use self::policy_document::PolicyDocument;
    pub use self::policy_document::PolicyStatus;
    pub use self::source_document::AuthMode;
    pub use self::source_document::SourceDocument;
    pub use self::source_document::SourceStatus;
    pub use self::tool_document::ParameterLocation;
    pub use self::tool_document::ToolDocument;
    pub use self::tool_document::ToolParameter;
    pub use self::tool_selector::SelectorKind;
    pub use self::tool_selector::ToolSelector;
}
pub mod provider;
pub mod time;

pub use self::provider::StoreProvider;

/// Read-model collection holding [model::SourceDocument]s.
pub const COLLECTION_SOURCES: &str = "sources";
/// Read-model collection holding [model::ToolDocument]s.
pub const COLLECTION_TOOLS: &str = "tools";
/// Read-model collection holding [model::GroupDocument]s.
pub const COLLECTION_GROUPS: &str = "groups";
/// Read-model collection holding [model::PolicyDocument]s.
pub const COLLECTION_POLICIES: &str = "policies";
