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

//! Projection of journal events into the denormalized read model.

use super::domain::event_types;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use toolgate_store::COLLECTION_GROUPS;
use toolgate_store::COLLECTION_POLICIES;
use toolgate_store::COLLECTION_SOURCES;
use toolgate_store::COLLECTION_TOOLS;
use toolgate_store::StoreProvider;
use toolgate_store::model::DomainEvent;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GroupDocument;
use toolgate_store::model::GroupStatus;
use toolgate_store::model::PolicyDocument;
use toolgate_store::model::PolicyStatus;
use toolgate_store::model::SourceDocument;
use toolgate_store::model::SourceStatus;
use toolgate_store::model::ToolDocument;
use toolgate_store::model::ToolSelector;
use toolgate_store::provider::facades::StoreProviderFacades;
use toolgate_store::time;

/** The single consumer that folds the global journal tail into the read
model.

Handlers are idempotent: every document carries the sequence of the last
applied event as `state_version` and events at or below it are skipped.
On restart the projector replays from its durable checkpoint. A handler
failure is retried with backoff; after `MAX_RETRIES` the projection halts
and the stall flag fails process liveness without corrupting the read
model.
*/
pub struct Projector {
    store: Arc<StoreProvider>,
    checkpoint: AtomicU64,
    stalled: AtomicBool,
}

impl Projector {
    /// Identifier of the durable checkpoint document.
    const PROJECTION_ID: &str = "read_model";
    /// Handler retries before the projection is declared stalled.
    const MAX_RETRIES: u32 = 5;
    /// Journal poll interval when the tail is drained.
    const POLL_INTERVAL_MICROS: u64 = 50_000;
    /// Batch size of one journal tail read.
    const BATCH_SIZE: usize = 256;

    /// Return a new instance and start projecting.
    pub async fn new(store: &Arc<StoreProvider>) -> Arc<Self> {
        let checkpoint = store
            .read_model_facade()
            .checkpoint_by_projection(Self::PROJECTION_ID)
            .await
            .ok()
            .flatten()
            .unwrap_or(0);
        let instance = Arc::new(Self {
            store: Arc::clone(store),
            checkpoint: AtomicU64::new(checkpoint),
            stalled: AtomicBool::new(false),
        });
        let self_clone = Arc::clone(&instance);
        tokio::spawn(async move { self_clone.run().await });
        instance
    }

    /// Return `true` when the projection halted after exhausting retries.
    pub fn is_stalled(&self) -> bool {
        self.stalled.load(Ordering::Relaxed)
    }

    /// Checkpoint of the newest projected event.
    pub fn checkpoint(&self) -> u64 {
        self.checkpoint.load(Ordering::Acquire)
    }

    /// Wait (bounded) until the projection caught up with the journal head.
    ///
    /// Gives command responses read-your-writes behavior on the query side.
    pub async fn await_caught_up(&self) {
        let head = self.store.event_journal_facade().head_checkpoint().await;
        for _ in 0..200 {
            if self.checkpoint() >= head || self.is_stalled() {
                return;
            }
            tokio::time::sleep(tokio::time::Duration::from_micros(10_000)).await;
        }
        log::warn!("Projection did not catch up with checkpoint {head} in time.");
    }

    /// Poll the journal tail and apply every event in order.
    async fn run(&self) {
        log::info!(
            "Projector starting from checkpoint {}.",
            self.checkpoint()
        );
        loop {
            if self.is_stalled() {
                return;
            }
            let from = self.checkpoint();
            let batch = match self
                .store
                .event_journal_facade()
                .read_global(from, Self::BATCH_SIZE)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    log::warn!("Projector failed to read the journal tail: {e}");
                    tokio::time::sleep(tokio::time::Duration::from_micros(
                        Self::POLL_INTERVAL_MICROS * 10,
                    ))
                    .await;
                    continue;
                }
            };
            if batch.is_empty() {
                tokio::time::sleep(tokio::time::Duration::from_micros(
                    Self::POLL_INTERVAL_MICROS,
                ))
                .await;
                continue;
            }
            for (checkpoint, event) in batch {
                if !self.apply_with_retries(&event).await {
                    self.stalled.store(true, Ordering::Relaxed);
                    log::error!(
                        "Projection stalled at checkpoint {checkpoint} on event type '{}'.",
                        event.get_event_type()
                    );
                    return;
                }
                self.checkpoint.store(checkpoint, Ordering::Release);
                if let Err(e) = self
                    .store
                    .read_model_facade()
                    .checkpoint_store(Self::PROJECTION_ID, checkpoint)
                    .await
                {
                    log::warn!("Failed to persist projection checkpoint: {e}");
                }
            }
        }
    }

    /// Apply one event, retrying transient handler failures with backoff.
    async fn apply_with_retries(&self, event: &DomainEvent) -> bool {
        let mut backoff_micros = 100_000u64;
        for attempt in 0..=Self::MAX_RETRIES {
            match self.apply(event).await {
                Ok(()) => return true,
                Err(e) => {
                    log::warn!(
                        "Projection handler failed (attempt {attempt}) for '{}': {e}",
                        event.get_event_type()
                    );
                    tokio::time::sleep(tokio::time::Duration::from_micros(backoff_micros)).await;
                    backoff_micros = std::cmp::min(backoff_micros * 2, 5_000_000);
                }
            }
        }
        false
    }

    /// Apply one event to the read model. Duplicate application is a no-op.
    async fn apply(&self, event: &DomainEvent) -> Result<(), GatewayError> {
        let payload = event.get_payload();
        let sequence = event.get_sequence();
        match event.get_event_type() {
            event_types::SOURCE_REGISTERED => {
                self.apply_source_registered(payload, sequence).await
            }
            event_types::SOURCE_INVENTORY_REFRESHED => {
                self.apply_inventory_refreshed(payload, sequence).await
            }
            event_types::SOURCE_REFRESH_FAILED => {
                self.apply_source_status(payload, sequence, SourceStatus::Failed)
                    .await
            }
            event_types::SOURCE_UNREGISTERED => {
                self.apply_source_unregistered(payload, sequence).await
            }
            event_types::TOOL_ENABLED => self.apply_tool_enabled(payload, sequence, true).await,
            event_types::TOOL_DISABLED => self.apply_tool_enabled(payload, sequence, false).await,
            event_types::GROUP_CREATED
            | event_types::GROUP_UPDATED
            | event_types::GROUP_SELECTOR_ADDED
            | event_types::GROUP_SELECTOR_REMOVED
            | event_types::GROUP_EXPLICIT_TOOL_ADDED
            | event_types::GROUP_EXPLICIT_TOOL_REMOVED
            | event_types::GROUP_TOOL_EXCLUDED
            | event_types::GROUP_TOOL_INCLUDED
            | event_types::GROUP_ACTIVATED
            | event_types::GROUP_DEACTIVATED
            | event_types::GROUP_DELETED => {
                self.apply_group_event(event.get_event_type(), payload, sequence)
                    .await
            }
            event_types::POLICY_DEFINED
            | event_types::POLICY_MATCHERS_UPDATED
            | event_types::POLICY_GROUPS_UPDATED
            | event_types::POLICY_PRIORITY_CHANGED
            | event_types::POLICY_ACTIVATED
            | event_types::POLICY_DEACTIVATED
            | event_types::POLICY_DELETED => {
                self.apply_policy_event(event.get_event_type(), payload, sequence)
                    .await
            }
            event_types::MAINTENANCE_ORPHANED_TOOLS_CLEANUP => self.cleanup_orphaned_tools().await,
            other => {
                // Breaker transitions and future event versions don't
                // project into the read model.
                if log::log_enabled!(log::Level::Trace) {
                    log::trace!("No projection handler for event type '{other}'.");
                }
                Ok(())
            }
        }
    }

    async fn apply_source_registered(
        &self,
        payload: &Value,
        sequence: u64,
    ) -> Result<(), GatewayError> {
        let source_id = Self::required_str(payload, "source_id")?;
        if self.is_already_applied(COLLECTION_SOURCES, source_id, sequence).await? {
            return Ok(());
        }
        let document = SourceDocument {
            source_id: source_id.to_owned(),
            name: Self::required_str(payload, "name")?.to_owned(),
            spec_url: Self::required_str(payload, "spec_url")?.to_owned(),
            base_url: None,
            auth_mode: payload
                .get("auth_mode")
                .cloned()
                .and_then(|value| serde_json::from_value(value).ok())
                .unwrap_or(toolgate_store::model::AuthMode::None),
            default_audience: payload
                .get("default_audience")
                .and_then(Value::as_str)
                .map(str::to_owned),
            status: SourceStatus::Active,
            inventory_version: 0,
            last_refreshed_at: None,
            state_version: sequence,
        };
        self.upsert(COLLECTION_SOURCES, source_id, &document).await
    }

    async fn apply_inventory_refreshed(
        &self,
        payload: &Value,
        sequence: u64,
    ) -> Result<(), GatewayError> {
        let source_id = Self::required_str(payload, "source_id")?;
        let Some(mut source) = self.source_by_id(source_id).await? else {
            return Ok(());
        };
        if source.state_version >= sequence {
            return Ok(());
        }
        source.inventory_version = payload
            .get("inventory_version")
            .and_then(Value::as_u64)
            .unwrap_or(source.inventory_version + 1);
        source.last_refreshed_at = payload
            .get("refreshed_at")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or(Some(time::as_rfc3339(time::get_timestamp_micros())));
        if let Some(base_url) = payload.get("base_url").and_then(Value::as_str) {
            source.base_url = Some(base_url.to_owned());
        }
        source.status = SourceStatus::Active;
        source.state_version = sequence;
        let read_model = self.store.read_model_facade();
        for removed in payload
            .get("removed_operation_ids")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
        {
            if let Some(operation_id) = removed.as_str() {
                read_model
                    .document_delete(
                        COLLECTION_TOOLS,
                        &ToolDocument::tool_id_from(source_id, operation_id),
                    )
                    .await?;
            }
        }
        let tools = payload
            .get("tools")
            .cloned()
            .and_then(|value| serde_json::from_value::<Vec<ToolDocument>>(value).ok())
            .unwrap_or_default();
        for mut tool in tools {
            tool.state_version = sequence;
            self.upsert(COLLECTION_TOOLS, &tool.tool_id.to_owned(), &tool)
                .await?;
        }
        self.upsert(COLLECTION_SOURCES, source_id, &source).await
    }

    async fn apply_source_status(
        &self,
        payload: &Value,
        sequence: u64,
        status: SourceStatus,
    ) -> Result<(), GatewayError> {
        let source_id = Self::required_str(payload, "source_id")?;
        let Some(mut source) = self.source_by_id(source_id).await? else {
            return Ok(());
        };
        if source.state_version >= sequence {
            return Ok(());
        }
        source.status = status;
        source.state_version = sequence;
        self.upsert(COLLECTION_SOURCES, source_id, &source).await
    }

    async fn apply_source_unregistered(
        &self,
        payload: &Value,
        sequence: u64,
    ) -> Result<(), GatewayError> {
        let source_id = Self::required_str(payload, "source_id")?;
        if let Some(source) = self.source_by_id(source_id).await? {
            if source.state_version >= sequence {
                return Ok(());
            }
        }
        let read_model = self.store.read_model_facade();
        read_model
            .document_delete(COLLECTION_SOURCES, source_id)
            .await?;
        // A source takes all of its tools with it.
        for document in read_model.documents_by_collection(COLLECTION_TOOLS).await? {
            if let Ok(tool) = serde_json::from_str::<ToolDocument>(&document) {
                if tool.source_id == source_id {
                    read_model
                        .document_delete(COLLECTION_TOOLS, &tool.tool_id)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn apply_tool_enabled(
        &self,
        payload: &Value,
        sequence: u64,
        enabled: bool,
    ) -> Result<(), GatewayError> {
        let tool_id = Self::required_str(payload, "tool_id")?;
        let Some(document) = self
            .store
            .read_model_facade()
            .document_by_id(COLLECTION_TOOLS, tool_id)
            .await?
        else {
            return Ok(());
        };
        let Ok(mut tool) = serde_json::from_str::<ToolDocument>(&document) else {
            return Ok(());
        };
        if tool.state_version >= sequence {
            return Ok(());
        }
        tool.enabled = enabled;
        tool.state_version = sequence;
        self.upsert(COLLECTION_TOOLS, tool_id, &tool).await
    }

    async fn apply_group_event(
        &self,
        event_type: &str,
        payload: &Value,
        sequence: u64,
    ) -> Result<(), GatewayError> {
        let group_id = Self::required_str(payload, "group_id")?;
        let read_model = self.store.read_model_facade();
        if event_type == event_types::GROUP_DELETED {
            read_model
                .document_delete(COLLECTION_GROUPS, group_id)
                .await?;
            return Ok(());
        }
        let existing = read_model
            .document_by_id(COLLECTION_GROUPS, group_id)
            .await?
            .and_then(|document| serde_json::from_str::<GroupDocument>(&document).ok());
        if let Some(existing) = &existing {
            if existing.state_version >= sequence {
                return Ok(());
            }
        }
        let mut group = match (event_type, existing) {
            (event_types::GROUP_CREATED, _) => GroupDocument {
                group_id: group_id.to_owned(),
                name: Self::required_str(payload, "name")?.to_owned(),
                selectors: Self::selectors_of(payload.get("selectors")),
                explicit_tool_ids: Self::strings_of(payload.get("explicit_tool_ids")),
                excluded_tool_ids: Self::strings_of(payload.get("excluded_tool_ids")),
                status: GroupStatus::Inactive,
                state_version: sequence,
            },
            (_, Some(group)) => group,
            // Deltas for a group that never projected: nothing to fold onto.
            (_, None) => return Ok(()),
        };
        match event_type {
            event_types::GROUP_CREATED => {}
            event_types::GROUP_UPDATED => {
                if let Some(name) = payload.get("name").and_then(Value::as_str) {
                    group.name = name.to_owned();
                }
                if let Some(selectors) = payload.get("selectors") {
                    group.selectors = Self::selectors_of(Some(selectors));
                }
            }
            event_types::GROUP_SELECTOR_ADDED => {
                if let Some(selector) = Self::selector_of(payload.get("selector")) {
                    if !group.selectors.contains(&selector) {
                        group.selectors.push(selector);
                    }
                }
            }
            event_types::GROUP_SELECTOR_REMOVED => {
                if let Some(selector) = Self::selector_of(payload.get("selector")) {
                    group.selectors.retain(|existing| existing != &selector);
                }
            }
            event_types::GROUP_EXPLICIT_TOOL_ADDED => {
                if let Some(tool_id) = payload.get("tool_id").and_then(Value::as_str) {
                    if !group.explicit_tool_ids.iter().any(|id| id == tool_id) {
                        group.explicit_tool_ids.push(tool_id.to_owned());
                    }
                    group.excluded_tool_ids.retain(|id| id != tool_id);
                }
            }
            event_types::GROUP_EXPLICIT_TOOL_REMOVED => {
                if let Some(tool_id) = payload.get("tool_id").and_then(Value::as_str) {
                    group.explicit_tool_ids.retain(|id| id != tool_id);
                }
            }
            event_types::GROUP_TOOL_EXCLUDED => {
                if let Some(tool_id) = payload.get("tool_id").and_then(Value::as_str) {
                    if !group.excluded_tool_ids.iter().any(|id| id == tool_id) {
                        group.excluded_tool_ids.push(tool_id.to_owned());
                    }
                    group.explicit_tool_ids.retain(|id| id != tool_id);
                }
            }
            event_types::GROUP_TOOL_INCLUDED => {
                if let Some(tool_id) = payload.get("tool_id").and_then(Value::as_str) {
                    group.excluded_tool_ids.retain(|id| id != tool_id);
                }
            }
            event_types::GROUP_ACTIVATED => group.status = GroupStatus::Active,
            event_types::GROUP_DEACTIVATED => group.status = GroupStatus::Inactive,
            _ => {}
        }
        group.state_version = sequence;
        self.upsert(COLLECTION_GROUPS, group_id, &group).await
    }

    async fn apply_policy_event(
        &self,
        event_type: &str,
        payload: &Value,
        sequence: u64,
    ) -> Result<(), GatewayError> {
        let policy_id = Self::required_str(payload, "policy_id")?;
        let read_model = self.store.read_model_facade();
        if event_type == event_types::POLICY_DELETED {
            read_model
                .document_delete(COLLECTION_POLICIES, policy_id)
                .await?;
            return Ok(());
        }
        let existing = read_model
            .document_by_id(COLLECTION_POLICIES, policy_id)
            .await?
            .and_then(|document| serde_json::from_str::<PolicyDocument>(&document).ok());
        if let Some(existing) = &existing {
            if existing.state_version >= sequence {
                return Ok(());
            }
        }
        let mut policy = match (event_type, existing) {
            (event_types::POLICY_DEFINED, _) => PolicyDocument {
                policy_id: policy_id.to_owned(),
                name: Self::required_str(payload, "name")?.to_owned(),
                matchers: payload
                    .get("matchers")
                    .cloned()
                    .and_then(|value| serde_json::from_value(value).ok())
                    .unwrap_or_default(),
                group_ids: Self::strings_of(payload.get("group_ids")),
                priority: payload
                    .get("priority")
                    .and_then(Value::as_i64)
                    .unwrap_or_default(),
                status: PolicyStatus::Inactive,
                state_version: sequence,
            },
            (_, Some(policy)) => policy,
            (_, None) => return Ok(()),
        };
        match event_type {
            event_types::POLICY_DEFINED => {}
            event_types::POLICY_MATCHERS_UPDATED => {
                policy.matchers = payload
                    .get("matchers")
                    .cloned()
                    .and_then(|value| serde_json::from_value(value).ok())
                    .unwrap_or_default();
            }
            event_types::POLICY_GROUPS_UPDATED => {
                policy.group_ids = Self::strings_of(payload.get("group_ids"));
            }
            event_types::POLICY_PRIORITY_CHANGED => {
                policy.priority = payload
                    .get("priority")
                    .and_then(Value::as_i64)
                    .unwrap_or(policy.priority);
            }
            event_types::POLICY_ACTIVATED => policy.status = PolicyStatus::Active,
            event_types::POLICY_DEACTIVATED => policy.status = PolicyStatus::Inactive,
            _ => {}
        }
        policy.state_version = sequence;
        self.upsert(COLLECTION_POLICIES, policy_id, &policy).await
    }

    /// Delete tools whose source document no longer exists.
    async fn cleanup_orphaned_tools(&self) -> Result<(), GatewayError> {
        let read_model = self.store.read_model_facade();
        let mut removed = 0usize;
        for document in read_model.documents_by_collection(COLLECTION_TOOLS).await? {
            let Ok(tool) = serde_json::from_str::<ToolDocument>(&document) else {
                continue;
            };
            if read_model
                .document_by_id(COLLECTION_SOURCES, &tool.source_id)
                .await?
                .is_none()
            {
                read_model
                    .document_delete(COLLECTION_TOOLS, &tool.tool_id)
                    .await?;
                removed += 1;
            }
        }
        if removed > 0 {
            log::info!("Removed {removed} orphaned tools from the read model.");
        }
        Ok(())
    }

    async fn source_by_id(&self, source_id: &str) -> Result<Option<SourceDocument>, GatewayError> {
        Ok(self
            .store
            .read_model_facade()
            .document_by_id(COLLECTION_SOURCES, source_id)
            .await?
            .and_then(|document| serde_json::from_str(&document).ok()))
    }

    async fn is_already_applied(
        &self,
        collection: &str,
        document_id: &str,
        sequence: u64,
    ) -> Result<bool, GatewayError> {
        let Some(document) = self
            .store
            .read_model_facade()
            .document_by_id(collection, document_id)
            .await?
        else {
            return Ok(false);
        };
        let state_version = serde_json::from_str::<Value>(&document)
            .ok()
            .and_then(|value| value.get("state_version").and_then(Value::as_u64))
            .unwrap_or(0);
        Ok(state_version >= sequence)
    }

    async fn upsert<T: serde::Serialize>(
        &self,
        collection: &str,
        document_id: &str,
        document: &T,
    ) -> Result<(), GatewayError> {
        let serialized = serde_json::to_string(document).map_err(|e| {
            toolgate_store::model::GatewayErrorKind::Unspecified
                .error_with_msg(format!("Failed to serialize read model document: {e}"))
        })?;
        self.store
            .read_model_facade()
            .document_upsert(collection, document_id, &serialized)
            .await
    }

    fn required_str<'a>(payload: &'a Value, field: &str) -> Result<&'a str, GatewayError> {
        payload.get(field).and_then(Value::as_str).ok_or_else(|| {
            toolgate_store::model::GatewayErrorKind::Unspecified
                .error_with_msg(format!("Event payload is missing '{field}'."))
        })
    }

    fn strings_of(value: Option<&Value>) -> Vec<String> {
        value
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn selectors_of(value: Option<&Value>) -> Vec<ToolSelector> {
        value
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    fn selector_of(value: Option<&Value>) -> Option<ToolSelector> {
        value
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use toolgate_store::model::PendingEvent;
    use toolgate_store_mem::InMemStoreProvider;

    fn event(sequence: u64, event_type: &str, payload: Value) -> DomainEvent {
        DomainEvent::from_pending(
            "source-s1",
            sequence,
            &PendingEvent::new(event_type, payload, "c1"),
        )
    }

    #[tokio::test]
    async fn duplicate_and_stale_application_is_a_no_op() {
        let provider = InMemStoreProvider::new().await;
        let store = Arc::new(provider.as_store_provider());
        let projector = Projector::new(&store).await;
        let registered = event(
            1,
            event_types::SOURCE_REGISTERED,
            json!({
                "source_id": "s1",
                "name": "Pizzeria",
                "spec_url": "http://svc/openapi.json",
                "auth_mode": "none",
            }),
        );
        let refreshed = event(
            2,
            event_types::SOURCE_INVENTORY_REFRESHED,
            json!({
                "source_id": "s1",
                "inventory_version": 1,
                "refreshed_at": "2025-01-01T00:00:00.000000Z",
                "tools": [{
                    "tool_id": "s1/get_menu",
                    "source_id": "s1",
                    "operation_id": "get_menu",
                    "http_method": "GET",
                    "path_template": "/api/menu",
                    "summary": null,
                    "tags": ["menu"],
                    "parameters": [],
                    "request_body_schema": null,
                    "response_schemas": {},
                    "enabled": true,
                    "state_version": 0,
                }],
                "removed_operation_ids": [],
            }),
        );
        let disabled = event(
            3,
            event_types::TOOL_DISABLED,
            json!({
                "source_id": "s1",
                "operation_id": "get_menu",
                "tool_id": "s1/get_menu",
            }),
        );
        projector.apply(&registered).await.unwrap();
        projector.apply(&registered).await.unwrap();
        projector.apply(&refreshed).await.unwrap();
        projector.apply(&disabled).await.unwrap();
        // Duplicate and out-of-order replays after the checkpoint change
        // nothing.
        projector.apply(&disabled).await.unwrap();
        projector.apply(&refreshed).await.unwrap();
        let source: SourceDocument = serde_json::from_str(
            &store
                .read_model_facade()
                .document_by_id(COLLECTION_SOURCES, "s1")
                .await
                .unwrap()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(source.inventory_version, 1);
        assert_eq!(source.state_version, 2);
        let tool: ToolDocument = serde_json::from_str(
            &store
                .read_model_facade()
                .document_by_id(COLLECTION_TOOLS, "s1/get_menu")
                .await
                .unwrap()
                .unwrap(),
        )
        .unwrap();
        assert!(!tool.enabled);
        assert_eq!(tool.state_version, 3);
    }
}
