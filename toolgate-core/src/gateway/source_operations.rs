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

//! Upstream source commands.

use super::Gateway;
use super::auth::AgentIdentity;
use super::domain::SourceAggregate;
use super::domain::event_types;
use super::normalizer::OpenApiNormalizer;
use toolgate_store::COLLECTION_SOURCES;
use toolgate_store::model::AuthMode;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::PendingEvent;
use toolgate_store::model::SourceDocument;
use toolgate_store::provider::facades::StoreProviderFacades;

impl Gateway {
    /// Register a new upstream source.
    ///
    /// Returns the generated source identifier. The inventory stays empty
    /// until the first refresh.
    pub async fn register_source(
        &self,
        identity: &AgentIdentity,
        name: &str,
        spec_url: &str,
        auth_mode: &AuthMode,
        default_audience: Option<&str>,
    ) -> Result<String, GatewayError> {
        self.assert_admin(identity)?;
        self.assert_unique_source_name(name).await?;
        let source_id = uuid::Uuid::new_v4().to_string();
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&SourceAggregate::stream_id(&source_id), |events| {
            SourceAggregate::from_events(&source_id, events).register(
                name,
                spec_url,
                auth_mode,
                default_audience,
                &correlation_id,
            )
        })
        .await?;
        log::info!("Source '{name}' was registered as '{source_id}' by '{identity}'.");
        Ok(source_id)
    }

    /// Fetch, normalize and reconcile a source's OpenAPI inventory.
    ///
    /// Returns the new inventory version. Fetch and normalization failures
    /// mark the source `failed`.
    pub async fn refresh_inventory(
        &self,
        identity: &AgentIdentity,
        source_id: &str,
    ) -> Result<u64, GatewayError> {
        self.assert_admin(identity)?;
        let journal = self.store.event_journal_facade();
        let stream_id = SourceAggregate::stream_id(source_id);
        let aggregate =
            SourceAggregate::from_events(source_id, &journal.read(&stream_id, 0).await?);
        if !aggregate.is_live() {
            return Err(GatewayErrorKind::NotFound
                .error_with_msg(format!("Source '{source_id}' does not exist.")));
        }
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let spec_bytes = match self.fetch_spec(aggregate.spec_url()).await {
            Ok(spec_bytes) => spec_bytes,
            Err(e) => {
                self.mark_refresh_failed(source_id, &e.to_string(), &correlation_id)
                    .await;
                return Err(e);
            }
        };
        let inventory = match OpenApiNormalizer::normalize(&spec_bytes, source_id) {
            Ok(inventory) => inventory,
            Err(e) => {
                self.mark_refresh_failed(source_id, &e.to_string(), &correlation_id)
                    .await;
                return Err(e);
            }
        };
        log::info!(
            "Refreshing inventory of source '{source_id}' with {} normalized tools.",
            inventory.tools.len()
        );
        self.handle_command(&stream_id, |events| {
            SourceAggregate::from_events(source_id, events).refresh_inventory(
                inventory.tools.to_vec(),
                inventory.server_url.as_deref(),
                &correlation_id,
            )
        })
        .await?;
        self.invalidate_access_cache();
        if let Some(metrics) = &self.metrics {
            metrics.inc_inventory_refresh(source_id);
        }
        let refreshed =
            SourceAggregate::from_events(source_id, &journal.read(&stream_id, 0).await?);
        Ok(refreshed.inventory_version())
    }

    /// Unregister a source. All of its tools go away with it.
    pub async fn unregister_source(
        &self,
        identity: &AgentIdentity,
        source_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&SourceAggregate::stream_id(source_id), |events| {
            SourceAggregate::from_events(source_id, events).unregister(&correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        log::info!("Source '{source_id}' was unregistered by '{identity}'.");
        Ok(())
    }

    /// Re-enable a soft-disabled tool.
    pub async fn enable_tool(
        &self,
        identity: &AgentIdentity,
        tool_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let (source_id, operation_id) = Self::split_tool_id(tool_id)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&SourceAggregate::stream_id(&source_id), |events| {
            SourceAggregate::from_events(&source_id, events)
                .enable_tool(&operation_id, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Soft-disable a tool. The flag survives inventory refreshes.
    pub async fn disable_tool(
        &self,
        identity: &AgentIdentity,
        tool_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let (source_id, operation_id) = Self::split_tool_id(tool_id)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&SourceAggregate::stream_id(&source_id), |events| {
            SourceAggregate::from_events(&source_id, events)
                .disable_tool(&operation_id, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Sweep tools whose source no longer exists from the read model.
    pub async fn cleanup_orphaned_tools(
        &self,
        identity: &AgentIdentity,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let requested_by = identity.identity_string().to_owned();
        self.handle_command("maintenance", |_events| {
            Ok(vec![PendingEvent::new(
                event_types::MAINTENANCE_ORPHANED_TOOLS_CLEANUP,
                serde_json::json!({ "requested_by": requested_by }),
                &correlation_id,
            )])
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Download the OpenAPI document of a source.
    async fn fetch_spec(&self, spec_url: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self
            .spec_client
            .get(spec_url)
            .send()
            .await
            .map_err(|e| {
                GatewayErrorKind::UpstreamFailure
                    .error_with_msg(format!("Failed to fetch OpenAPI document: {e}"))
            })?;
        if !response.status().is_success() {
            return Err(GatewayErrorKind::UpstreamFailure.error_with_msg(format!(
                "OpenAPI document fetch responded with HTTP {}.",
                response.status().as_u16()
            )));
        }
        Ok(response
            .bytes()
            .await
            .map_err(|e| {
                GatewayErrorKind::UpstreamFailure
                    .error_with_msg(format!("Failed to read OpenAPI document: {e}"))
            })?
            .to_vec())
    }

    /// Best-effort transition of a source to `failed` after a refresh error.
    async fn mark_refresh_failed(&self, source_id: &str, reason: &str, correlation_id: &str) {
        let res = self
            .handle_command(&SourceAggregate::stream_id(source_id), |events| {
                SourceAggregate::from_events(source_id, events)
                    .mark_refresh_failed(reason, correlation_id)
            })
            .await;
        if let Err(e) = res {
            log::warn!("Failed to mark source '{source_id}' as failed: {e}");
        }
    }

    /// Registered source names stay unique.
    async fn assert_unique_source_name(&self, name: &str) -> Result<(), GatewayError> {
        let clash = self
            .store
            .read_model_facade()
            .documents_by_collection(COLLECTION_SOURCES)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<SourceDocument>(document).ok())
            .any(|source| source.name == name);
        if clash {
            return Err(GatewayErrorKind::BusinessRule
                .error_with_msg(format!("A source named '{name}' is already registered.")));
        }
        Ok(())
    }

    /// Split `{source_id}/{operation_id}` into its parts.
    pub(crate) fn split_tool_id(tool_id: &str) -> Result<(String, String), GatewayError> {
        tool_id
            .split_once('/')
            .filter(|(source_id, operation_id)| {
                !source_id.is_empty() && !operation_id.is_empty()
            })
            .map(|(source_id, operation_id)| (source_id.to_owned(), operation_id.to_owned()))
            .ok_or_else(|| {
                GatewayErrorKind::Validation
                    .error_with_msg(format!("Malformed tool identifier '{tool_id}'."))
            })
    }
}
