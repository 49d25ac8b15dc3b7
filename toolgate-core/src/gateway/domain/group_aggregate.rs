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

//! Tool group aggregate.

use super::event_types;
use serde_json::json;
use std::collections::BTreeSet;
use toolgate_store::model::DomainEvent;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::GroupStatus;
use toolgate_store::model::PendingEvent;
use toolgate_store::model::ToolSelector;

/** Tool group aggregate.

Folded from the `group-{id}` event stream. The explicit and excluded tool
sets are kept disjoint: explicitly adding a tool lifts its exclusion and
excluding a tool drops it from the explicit set.
*/
pub struct GroupAggregate {
    group_id: String,
    version: u64,
    exists: bool,
    deleted: bool,
    status: GroupStatus,
    selectors: Vec<ToolSelector>,
    explicit_tool_ids: BTreeSet<String>,
    excluded_tool_ids: BTreeSet<String>,
}

impl GroupAggregate {
    /// Journal stream identifier of a group aggregate.
    pub fn stream_id(group_id: &str) -> String {
        format!("group-{group_id}")
    }

    /// Fold the aggregate from its event stream.
    pub fn from_events(group_id: &str, events: &[DomainEvent]) -> Self {
        let mut aggregate = Self {
            group_id: group_id.to_owned(),
            version: 0,
            exists: false,
            deleted: false,
            status: GroupStatus::Inactive,
            selectors: Vec::new(),
            explicit_tool_ids: BTreeSet::new(),
            excluded_tool_ids: BTreeSet::new(),
        };
        for event in events {
            aggregate.apply(event);
        }
        aggregate
    }

    /// Apply one journaled event to the folded state.
    fn apply(&mut self, event: &DomainEvent) {
        self.version = event.get_sequence();
        let payload = event.get_payload();
        match event.get_event_type() {
            event_types::GROUP_CREATED => {
                self.exists = true;
                self.selectors = Self::selectors_from(payload.get("selectors"));
                self.explicit_tool_ids = Self::string_set_from(payload.get("explicit_tool_ids"));
                self.excluded_tool_ids = Self::string_set_from(payload.get("excluded_tool_ids"));
            }
            event_types::GROUP_UPDATED => {
                if let Some(selectors) = payload.get("selectors") {
                    self.selectors = Self::selectors_from(Some(selectors));
                }
            }
            event_types::GROUP_SELECTOR_ADDED => {
                if let Some(selector) = Self::selector_from(payload.get("selector")) {
                    if !self.selectors.contains(&selector) {
                        self.selectors.push(selector);
                    }
                }
            }
            event_types::GROUP_SELECTOR_REMOVED => {
                if let Some(selector) = Self::selector_from(payload.get("selector")) {
                    self.selectors.retain(|existing| existing != &selector);
                }
            }
            event_types::GROUP_EXPLICIT_TOOL_ADDED => {
                if let Some(tool_id) = payload.get("tool_id").and_then(serde_json::Value::as_str) {
                    self.explicit_tool_ids.insert(tool_id.to_owned());
                    self.excluded_tool_ids.remove(tool_id);
                }
            }
            event_types::GROUP_EXPLICIT_TOOL_REMOVED => {
                if let Some(tool_id) = payload.get("tool_id").and_then(serde_json::Value::as_str) {
                    self.explicit_tool_ids.remove(tool_id);
                }
            }
            event_types::GROUP_TOOL_EXCLUDED => {
                if let Some(tool_id) = payload.get("tool_id").and_then(serde_json::Value::as_str) {
                    self.excluded_tool_ids.insert(tool_id.to_owned());
                    self.explicit_tool_ids.remove(tool_id);
                }
            }
            event_types::GROUP_TOOL_INCLUDED => {
                if let Some(tool_id) = payload.get("tool_id").and_then(serde_json::Value::as_str) {
                    self.excluded_tool_ids.remove(tool_id);
                }
            }
            event_types::GROUP_ACTIVATED => {
                self.status = GroupStatus::Active;
            }
            event_types::GROUP_DEACTIVATED => {
                self.status = GroupStatus::Inactive;
            }
            event_types::GROUP_DELETED => {
                self.deleted = true;
            }
            other => {
                log::debug!("Ignoring unknown event type '{other}' in group stream.");
            }
        }
    }

    fn selectors_from(value: Option<&serde_json::Value>) -> Vec<ToolSelector> {
        value
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    fn selector_from(value: Option<&serde_json::Value>) -> Option<ToolSelector> {
        value
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    fn string_set_from(value: Option<&serde_json::Value>) -> BTreeSet<String> {
        value
            .and_then(serde_json::Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(serde_json::Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Current stream version for optimistic appends.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Return `true` when the aggregate holds a live group.
    pub fn is_live(&self) -> bool {
        self.exists && !self.deleted
    }

    /// Decide creation of a new group.
    pub fn create(
        &self,
        name: &str,
        selectors: &[ToolSelector],
        explicit_tool_ids: &[String],
        excluded_tool_ids: &[String],
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        if self.exists {
            return Err(GatewayErrorKind::BusinessRule
                .error_with_msg(format!("Group '{}' already exists.", self.group_id)));
        }
        if name.trim().is_empty() {
            return Err(
                GatewayErrorKind::Validation.error_with_msg("Group creation requires a name.")
            );
        }
        Self::assert_valid_selectors(selectors)?;
        if explicit_tool_ids
            .iter()
            .any(|tool_id| excluded_tool_ids.contains(tool_id))
        {
            return Err(GatewayErrorKind::Validation
                .error_with_msg("Explicit and excluded tool sets must be disjoint."));
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_CREATED,
            json!({
                "group_id": self.group_id,
                "name": name,
                "selectors": selectors,
                "explicit_tool_ids": explicit_tool_ids,
                "excluded_tool_ids": excluded_tool_ids,
            }),
            correlation_id,
        )])
    }

    /// Decide an atomic replacement of name and selector set.
    pub fn update(
        &self,
        name: Option<&str>,
        selectors: Option<&[ToolSelector]>,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if let Some(selectors) = selectors {
            Self::assert_valid_selectors(selectors)?;
        }
        if name.is_none() && selectors.is_none() {
            return Ok(vec![]);
        }
        let mut payload = serde_json::Map::new();
        payload.insert("group_id".to_owned(), json!(self.group_id));
        if let Some(name) = name {
            payload.insert("name".to_owned(), json!(name));
        }
        if let Some(selectors) = selectors {
            payload.insert("selectors".to_owned(), json!(selectors));
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_UPDATED,
            serde_json::Value::Object(payload),
            correlation_id,
        )])
    }

    /// Decide appending a selector. A duplicate selector is a no-op.
    pub fn add_selector(
        &self,
        selector: &ToolSelector,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        Self::assert_valid_selectors(std::slice::from_ref(selector))?;
        if self.selectors.contains(selector) {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_SELECTOR_ADDED,
            json!({ "group_id": self.group_id, "selector": selector }),
            correlation_id,
        )])
    }

    /// Decide removing a selector. A missing selector is a no-op.
    pub fn remove_selector(
        &self,
        selector: &ToolSelector,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if !self.selectors.contains(selector) {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_SELECTOR_REMOVED,
            json!({ "group_id": self.group_id, "selector": selector }),
            correlation_id,
        )])
    }

    /// Decide explicitly adding a tool. Lifts a previous exclusion.
    pub fn add_explicit_tool(
        &self,
        tool_id: &str,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if self.explicit_tool_ids.contains(tool_id) {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_EXPLICIT_TOOL_ADDED,
            json!({ "group_id": self.group_id, "tool_id": tool_id }),
            correlation_id,
        )])
    }

    /// Decide removing an explicitly added tool. Absence is a no-op.
    pub fn remove_explicit_tool(
        &self,
        tool_id: &str,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if !self.explicit_tool_ids.contains(tool_id) {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_EXPLICIT_TOOL_REMOVED,
            json!({ "group_id": self.group_id, "tool_id": tool_id }),
            correlation_id,
        )])
    }

    /// Decide excluding a tool. Drops it from the explicit set.
    pub fn exclude_tool(
        &self,
        tool_id: &str,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if self.excluded_tool_ids.contains(tool_id) {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_TOOL_EXCLUDED,
            json!({ "group_id": self.group_id, "tool_id": tool_id }),
            correlation_id,
        )])
    }

    /// Decide lifting a tool exclusion. Absence is a no-op.
    pub fn include_tool(
        &self,
        tool_id: &str,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if !self.excluded_tool_ids.contains(tool_id) {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_TOOL_INCLUDED,
            json!({ "group_id": self.group_id, "tool_id": tool_id }),
            correlation_id,
        )])
    }

    /// Decide activation. An active group is a no-op.
    pub fn activate(&self, correlation_id: &str) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if self.status == GroupStatus::Active {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_ACTIVATED,
            json!({ "group_id": self.group_id }),
            correlation_id,
        )])
    }

    /// Decide deactivation. An inactive group is a no-op.
    pub fn deactivate(&self, correlation_id: &str) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if self.status == GroupStatus::Inactive {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::GROUP_DEACTIVATED,
            json!({ "group_id": self.group_id }),
            correlation_id,
        )])
    }

    /// Decide deletion.
    pub fn delete(&self, correlation_id: &str) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        Ok(vec![PendingEvent::new(
            event_types::GROUP_DELETED,
            json!({ "group_id": self.group_id }),
            correlation_id,
        )])
    }

    fn assert_live(&self) -> Result<(), GatewayError> {
        if !self.is_live() {
            return Err(GatewayErrorKind::NotFound
                .error_with_msg(format!("Group '{}' does not exist.", self.group_id)));
        }
        Ok(())
    }

    /// Selector patterns must be well-formed before they reach the resolver.
    fn assert_valid_selectors(selectors: &[ToolSelector]) -> Result<(), GatewayError> {
        for selector in selectors {
            if selector.pattern.is_empty() {
                return Err(GatewayErrorKind::Validation
                    .error_with_msg("Selector pattern must not be empty."));
            }
            if let Some(expression) = selector.pattern.strip_prefix("regex:") {
                regex::RegexBuilder::new(expression)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        GatewayErrorKind::Validation
                            .error_with_msg(format!("Invalid selector regex: {e}"))
                    })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use toolgate_store::model::SelectorKind;

    fn selector(kind: SelectorKind, pattern: &str) -> ToolSelector {
        ToolSelector {
            kind,
            pattern: pattern.to_owned(),
        }
    }

    struct StreamHarness {
        group_id: String,
        events: Vec<DomainEvent>,
    }

    impl StreamHarness {
        fn new(group_id: &str) -> Self {
            Self {
                group_id: group_id.to_owned(),
                events: Vec::new(),
            }
        }

        fn aggregate(&self) -> GroupAggregate {
            GroupAggregate::from_events(&self.group_id, &self.events)
        }

        fn commit(&mut self, pending: Vec<PendingEvent>) {
            for event in pending {
                let sequence = self.events.len() as u64 + 1;
                self.events.push(DomainEvent::from_pending(
                    &GroupAggregate::stream_id(&self.group_id),
                    sequence,
                    &event,
                ));
            }
        }
    }

    fn created_harness() -> StreamHarness {
        let mut harness = StreamHarness::new("g1");
        let pending = harness
            .aggregate()
            .create("menu tools", &[selector(SelectorKind::Tag, "menu")], &[], &[], "c1")
            .unwrap();
        harness.commit(pending);
        harness
    }

    #[test]
    fn explicit_and_excluded_stay_disjoint() {
        let mut harness = created_harness();
        let pending = harness
            .aggregate()
            .add_explicit_tool("s1/get_menu", "c2")
            .unwrap();
        harness.commit(pending);
        let pending = harness.aggregate().exclude_tool("s1/get_menu", "c3").unwrap();
        harness.commit(pending);
        let aggregate = harness.aggregate();
        assert!(aggregate.excluded_tool_ids.contains("s1/get_menu"));
        assert!(!aggregate.explicit_tool_ids.contains("s1/get_menu"));
    }

    #[test]
    fn add_then_remove_explicit_tool_is_a_no_op() {
        let mut harness = created_harness();
        let pending = harness
            .aggregate()
            .add_explicit_tool("s1/get_menu", "c2")
            .unwrap();
        harness.commit(pending);
        let pending = harness
            .aggregate()
            .remove_explicit_tool("s1/get_menu", "c3")
            .unwrap();
        harness.commit(pending);
        assert!(harness.aggregate().explicit_tool_ids.is_empty());
        // Removing again decides no events at all.
        assert!(
            harness
                .aggregate()
                .remove_explicit_tool("s1/get_menu", "c4")
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn disjoint_rule_rejected_at_creation() {
        let harness = StreamHarness::new("g1");
        let res = harness.aggregate().create(
            "bad",
            &[],
            &["s1/get_menu".to_owned()],
            &["s1/get_menu".to_owned()],
            "c1",
        );
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::Validation);
    }

    #[test]
    fn invalid_selector_regex_is_rejected() {
        let harness = created_harness();
        let res = harness
            .aggregate()
            .add_selector(&selector(SelectorKind::Name, "regex:("), "c2");
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::Validation);
    }

    #[test]
    fn deleted_group_rejects_commands() {
        let mut harness = created_harness();
        let pending = harness.aggregate().delete("c2").unwrap();
        harness.commit(pending);
        assert_eq!(
            harness.aggregate().activate("c3").unwrap_err().kind(),
            &GatewayErrorKind::NotFound
        );
    }
}
