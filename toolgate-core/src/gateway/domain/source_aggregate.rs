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

//! Upstream source aggregate.

use super::event_types;
use serde_json::json;
use std::collections::BTreeMap;
use toolgate_store::model::AuthMode;
use toolgate_store::model::DomainEvent;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::PendingEvent;
use toolgate_store::model::ToolDocument;
use toolgate_store::time;

/** Upstream source aggregate.

Folded from the `source-{id}` event stream. Tracks the operation inventory
as `operation_id -> enabled` so that the soft-disable flag survives
inventory refreshes that re-discover the same operation.
*/
pub struct SourceAggregate {
    source_id: String,
    version: u64,
    exists: bool,
    deleted: bool,
    spec_url: String,
    auth_mode: AuthMode,
    default_audience: Option<String>,
    inventory_version: u64,
    tools: BTreeMap<String, bool>,
}

impl SourceAggregate {
    /// Journal stream identifier of a source aggregate.
    pub fn stream_id(source_id: &str) -> String {
        format!("source-{source_id}")
    }

    /// Fold the aggregate from its event stream.
    pub fn from_events(source_id: &str, events: &[DomainEvent]) -> Self {
        let mut aggregate = Self {
            source_id: source_id.to_owned(),
            version: 0,
            exists: false,
            deleted: false,
            spec_url: String::new(),
            auth_mode: AuthMode::None,
            default_audience: None,
            inventory_version: 0,
            tools: BTreeMap::new(),
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
            event_types::SOURCE_REGISTERED => {
                self.exists = true;
                self.spec_url = payload
                    .get("spec_url")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                self.auth_mode = payload
                    .get("auth_mode")
                    .cloned()
                    .and_then(|value| serde_json::from_value(value).ok())
                    .unwrap_or(AuthMode::None);
                self.default_audience = payload
                    .get("default_audience")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_owned);
            }
            event_types::SOURCE_INVENTORY_REFRESHED => {
                self.inventory_version = payload
                    .get("inventory_version")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(self.inventory_version + 1);
                for removed in payload
                    .get("removed_operation_ids")
                    .and_then(serde_json::Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                {
                    if let Some(operation_id) = removed.as_str() {
                        self.tools.remove(operation_id);
                    }
                }
                for tool in payload
                    .get("tools")
                    .and_then(serde_json::Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                {
                    if let (Some(operation_id), Some(enabled)) = (
                        tool.get("operation_id").and_then(serde_json::Value::as_str),
                        tool.get("enabled").and_then(serde_json::Value::as_bool),
                    ) {
                        self.tools.insert(operation_id.to_owned(), enabled);
                    }
                }
            }
            event_types::SOURCE_UNREGISTERED => {
                self.deleted = true;
                self.tools.clear();
            }
            event_types::TOOL_ENABLED => {
                if let Some(operation_id) =
                    payload.get("operation_id").and_then(serde_json::Value::as_str)
                {
                    self.tools.insert(operation_id.to_owned(), true);
                }
            }
            event_types::TOOL_DISABLED => {
                if let Some(operation_id) =
                    payload.get("operation_id").and_then(serde_json::Value::as_str)
                {
                    self.tools.insert(operation_id.to_owned(), false);
                }
            }
            event_types::SOURCE_REFRESH_FAILED => {}
            other => {
                log::debug!("Ignoring unknown event type '{other}' in source stream.");
            }
        }
    }

    /// Current stream version for optimistic appends.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Return `true` when the aggregate holds a live source.
    pub fn is_live(&self) -> bool {
        self.exists && !self.deleted
    }

    /// Where the OpenAPI document is fetched from.
    pub fn spec_url(&self) -> &str {
        &self.spec_url
    }

    /// Configured token exchange audience.
    pub fn default_audience(&self) -> Option<&str> {
        self.default_audience.as_deref()
    }

    /// Inventory version after the last successful refresh.
    pub fn inventory_version(&self) -> u64 {
        self.inventory_version
    }

    /// Configured credential strategy.
    pub fn auth_mode(&self) -> &AuthMode {
        &self.auth_mode
    }

    /// Decide registration of a new source.
    pub fn register(
        &self,
        name: &str,
        spec_url: &str,
        auth_mode: &AuthMode,
        default_audience: Option<&str>,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        if self.exists {
            return Err(GatewayErrorKind::BusinessRule
                .error_with_msg(format!("Source '{}' is already registered.", self.source_id)));
        }
        if name.trim().is_empty() || spec_url.trim().is_empty() {
            return Err(GatewayErrorKind::Validation
                .error_with_msg("Source registration requires a name and a spec_url."));
        }
        Ok(vec![PendingEvent::new(
            event_types::SOURCE_REGISTERED,
            json!({
                "source_id": self.source_id,
                "name": name,
                "spec_url": spec_url,
                "auth_mode": auth_mode,
                "default_audience": default_audience,
            }),
            correlation_id,
        )])
    }

    /// Decide an inventory refresh from freshly normalized tools.
    ///
    /// The enabled flag of re-discovered operations is preserved; operations
    /// that disappeared from the OpenAPI document are removed.
    pub fn refresh_inventory(
        &self,
        mut tools: Vec<ToolDocument>,
        base_url: Option<&str>,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        for tool in tools.iter_mut() {
            if let Some(enabled) = self.tools.get(&tool.operation_id) {
                tool.enabled = *enabled;
            }
        }
        let removed_operation_ids = self
            .tools
            .keys()
            .filter(|operation_id| {
                !tools
                    .iter()
                    .any(|tool| &&tool.operation_id == operation_id)
            })
            .cloned()
            .collect::<Vec<_>>();
        Ok(vec![PendingEvent::new(
            event_types::SOURCE_INVENTORY_REFRESHED,
            json!({
                "source_id": self.source_id,
                "inventory_version": self.inventory_version + 1,
                "refreshed_at": time::as_rfc3339(time::get_timestamp_micros()),
                "base_url": base_url,
                "tools": tools,
                "removed_operation_ids": removed_operation_ids,
            }),
            correlation_id,
        )])
    }

    /// Decide marking the source failed after a refresh error.
    pub fn mark_refresh_failed(
        &self,
        reason: &str,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        Ok(vec![PendingEvent::new(
            event_types::SOURCE_REFRESH_FAILED,
            json!({ "source_id": self.source_id, "reason": reason }),
            correlation_id,
        )])
    }

    /// Decide unregistration. All tools of the source go away with it.
    pub fn unregister(&self, correlation_id: &str) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        Ok(vec![PendingEvent::new(
            event_types::SOURCE_UNREGISTERED,
            json!({ "source_id": self.source_id }),
            correlation_id,
        )])
    }

    /// Decide re-enabling a tool. Already enabled tools are a no-op.
    pub fn enable_tool(
        &self,
        operation_id: &str,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        match self.tools.get(operation_id) {
            None => Err(GatewayErrorKind::NotFound.error_with_msg(format!(
                "Source '{}' has no operation '{operation_id}'.",
                self.source_id
            ))),
            Some(true) => Ok(vec![]),
            Some(false) => Ok(vec![PendingEvent::new(
                event_types::TOOL_ENABLED,
                json!({
                    "source_id": self.source_id,
                    "operation_id": operation_id,
                    "tool_id": ToolDocument::tool_id_from(&self.source_id, operation_id),
                }),
                correlation_id,
            )]),
        }
    }

    /// Decide soft-disabling a tool. Already disabled tools are a no-op.
    pub fn disable_tool(
        &self,
        operation_id: &str,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        match self.tools.get(operation_id) {
            None => Err(GatewayErrorKind::NotFound.error_with_msg(format!(
                "Source '{}' has no operation '{operation_id}'.",
                self.source_id
            ))),
            Some(false) => Ok(vec![]),
            Some(true) => Ok(vec![PendingEvent::new(
                event_types::TOOL_DISABLED,
                json!({
                    "source_id": self.source_id,
                    "operation_id": operation_id,
                    "tool_id": ToolDocument::tool_id_from(&self.source_id, operation_id),
                }),
                correlation_id,
            )]),
        }
    }

    fn assert_live(&self) -> Result<(), GatewayError> {
        if !self.is_live() {
            return Err(GatewayErrorKind::NotFound
                .error_with_msg(format!("Source '{}' does not exist.", self.source_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use toolgate_store::model::ParameterLocation;

    fn tool(source_id: &str, operation_id: &str) -> ToolDocument {
        ToolDocument {
            tool_id: ToolDocument::tool_id_from(source_id, operation_id),
            source_id: source_id.to_owned(),
            operation_id: operation_id.to_owned(),
            http_method: "GET".to_owned(),
            path_template: "/api/menu".to_owned(),
            summary: None,
            tags: vec![],
            parameters: vec![toolgate_store::model::ToolParameter {
                name: "item_id".to_owned(),
                location: ParameterLocation::Path,
                required: true,
                schema_type: "string".to_owned(),
            }],
            request_body_schema: None,
            response_schemas: Default::default(),
            enabled: true,
            state_version: 0,
        }
    }

    /// Test double for the command handler loop: decide, journal, re-fold.
    struct StreamHarness {
        source_id: String,
        events: Vec<DomainEvent>,
    }

    impl StreamHarness {
        fn new(source_id: &str) -> Self {
            Self {
                source_id: source_id.to_owned(),
                events: Vec::new(),
            }
        }

        fn aggregate(&self) -> SourceAggregate {
            SourceAggregate::from_events(&self.source_id, &self.events)
        }

        fn commit(&mut self, pending: Vec<PendingEvent>) {
            for event in pending {
                let sequence = self.events.len() as u64 + 1;
                self.events.push(DomainEvent::from_pending(
                    &SourceAggregate::stream_id(&self.source_id),
                    sequence,
                    &event,
                ));
            }
        }
    }

    #[test]
    fn register_twice_is_rejected() {
        let mut harness = StreamHarness::new("s1");
        let pending = harness
            .aggregate()
            .register(
                "Pizzeria",
                "http://svc/openapi.json",
                &AuthMode::TokenExchange,
                Some("pizzeria-backend"),
                "c1",
            )
            .unwrap();
        harness.commit(pending);
        let aggregate = harness.aggregate();
        assert!(aggregate.is_live());
        assert_eq!(
            aggregate
                .register("Pizzeria", "http://svc/openapi.json", &AuthMode::None, None, "c2")
                .unwrap_err()
                .kind(),
            &GatewayErrorKind::BusinessRule
        );
    }

    #[test]
    fn disabled_flag_survives_refresh() {
        let mut harness = StreamHarness::new("s1");
        let pending = harness
            .aggregate()
            .register("Pizzeria", "http://svc/openapi.json", &AuthMode::None, None, "c1")
            .unwrap();
        harness.commit(pending);
        let pending = harness
            .aggregate()
            .refresh_inventory(vec![tool("s1", "get_menu")], None, "c2")
            .unwrap();
        harness.commit(pending);
        let pending = harness.aggregate().disable_tool("get_menu", "c3").unwrap();
        harness.commit(pending);
        // A refresh that re-discovers the same operation keeps it disabled.
        let events = harness
            .aggregate()
            .refresh_inventory(vec![tool("s1", "get_menu"), tool("s1", "get_order")], None, "c4")
            .unwrap();
        let tools = events[0].get_payload().get("tools").unwrap().as_array().unwrap().to_owned();
        let enabled_by_operation = tools
            .iter()
            .map(|tool| {
                (
                    tool.get("operation_id").unwrap().as_str().unwrap().to_owned(),
                    tool.get("enabled").unwrap().as_bool().unwrap(),
                )
            })
            .collect::<std::collections::BTreeMap<_, _>>();
        assert_eq!(enabled_by_operation.get("get_menu"), Some(&false));
        assert_eq!(enabled_by_operation.get("get_order"), Some(&true));
    }

    #[test]
    fn refresh_reports_removed_operations() {
        let mut harness = StreamHarness::new("s1");
        let pending = harness
            .aggregate()
            .register("Pizzeria", "http://svc/openapi.json", &AuthMode::None, None, "c1")
            .unwrap();
        harness.commit(pending);
        let pending = harness
            .aggregate()
            .refresh_inventory(vec![tool("s1", "get_menu"), tool("s1", "get_order")], None, "c2")
            .unwrap();
        harness.commit(pending);
        let events = harness
            .aggregate()
            .refresh_inventory(vec![tool("s1", "get_menu")], None, "c3")
            .unwrap();
        let removed = events[0]
            .get_payload()
            .get("removed_operation_ids")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|value| value.as_str().unwrap().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(removed, vec!["get_order".to_owned()]);
    }

    #[test]
    fn unknown_operation_is_not_found() {
        let mut harness = StreamHarness::new("s1");
        let pending = harness
            .aggregate()
            .register("Pizzeria", "http://svc/openapi.json", &AuthMode::None, None, "c1")
            .unwrap();
        harness.commit(pending);
        assert_eq!(
            harness
                .aggregate()
                .disable_tool("no_such_operation", "c2")
                .unwrap_err()
                .kind(),
            &GatewayErrorKind::NotFound
        );
    }
}
