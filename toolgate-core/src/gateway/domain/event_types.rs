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

//! Versioned journal event type identifiers.

/// A new upstream source was registered.
pub const SOURCE_REGISTERED: &str = "source.registered.v1";
/// A source's OpenAPI document was normalized into a new tool inventory.
pub const SOURCE_INVENTORY_REFRESHED: &str = "source.inventory_refreshed.v1";
/// An inventory refresh failed and the source was marked failed.
pub const SOURCE_REFRESH_FAILED: &str = "source.refresh_failed.v1";
/// An upstream source was unregistered.
pub const SOURCE_UNREGISTERED: &str = "source.unregistered.v1";
/// A tool was re-enabled.
pub const TOOL_ENABLED: &str = "source.tool_enabled.v1";
/// A tool was soft-disabled.
pub const TOOL_DISABLED: &str = "source.tool_disabled.v1";

/// A tool group was created.
pub const GROUP_CREATED: &str = "group.created.v1";
/// A tool group's name and selector set were replaced.
pub const GROUP_UPDATED: &str = "group.updated.v1";
/// A selector was appended to a tool group.
pub const GROUP_SELECTOR_ADDED: &str = "group.selector_added.v1";
/// A selector was removed from a tool group.
pub const GROUP_SELECTOR_REMOVED: &str = "group.selector_removed.v1";
/// A tool was explicitly added to a group.
pub const GROUP_EXPLICIT_TOOL_ADDED: &str = "group.explicit_tool_added.v1";
/// An explicitly added tool was removed from a group.
pub const GROUP_EXPLICIT_TOOL_REMOVED: &str = "group.explicit_tool_removed.v1";
/// A tool was excluded from group membership.
pub const GROUP_TOOL_EXCLUDED: &str = "group.tool_excluded.v1";
/// An exclusion was lifted.
pub const GROUP_TOOL_INCLUDED: &str = "group.tool_included.v1";
/// A tool group was activated.
pub const GROUP_ACTIVATED: &str = "group.activated.v1";
/// A tool group was deactivated.
pub const GROUP_DEACTIVATED: &str = "group.deactivated.v1";
/// A tool group was deleted.
pub const GROUP_DELETED: &str = "group.deleted.v1";

/// An access policy was defined.
pub const POLICY_DEFINED: &str = "policy.defined.v1";
/// An access policy's matcher set was replaced.
pub const POLICY_MATCHERS_UPDATED: &str = "policy.matchers_updated.v1";
/// An access policy's group set was replaced.
pub const POLICY_GROUPS_UPDATED: &str = "policy.groups_updated.v1";
/// An access policy's priority changed.
pub const POLICY_PRIORITY_CHANGED: &str = "policy.priority_changed.v1";
/// An access policy was activated.
pub const POLICY_ACTIVATED: &str = "policy.activated.v1";
/// An access policy was deactivated.
pub const POLICY_DEACTIVATED: &str = "policy.deactivated.v1";
/// An access policy was deleted.
pub const POLICY_DELETED: &str = "policy.deleted.v1";

/// Requested sweep of tools whose source no longer exists.
pub const MAINTENANCE_ORPHANED_TOOLS_CLEANUP: &str = "maintenance.orphaned_tools_cleanup.v1";

/// A circuit breaker transitioned to `open`.
pub const BREAKER_OPENED: &str = "circuit_breaker.opened.v1";
/// A circuit breaker transitioned to `closed`.
pub const BREAKER_CLOSED: &str = "circuit_breaker.closed.v1";
/// A circuit breaker transitioned to `half_open`.
pub const BREAKER_HALF_OPENED: &str = "circuit_breaker.half_opened.v1";
