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

//! Tool group commands.

use super::Gateway;
use super::auth::AgentIdentity;
use super::domain::GroupAggregate;
use toolgate_store::model::GatewayError;
use toolgate_store::model::ToolSelector;

impl Gateway {
    /// Create a new tool group. Returns the generated group identifier.
    ///
    /// A new group starts inactive; activate it to make it grantable.
    pub async fn create_tool_group(
        &self,
        identity: &AgentIdentity,
        name: &str,
        selectors: &[ToolSelector],
        explicit_tool_ids: &[String],
        excluded_tool_ids: &[String],
    ) -> Result<String, GatewayError> {
        self.assert_admin(identity)?;
        let group_id = uuid::Uuid::new_v4().to_string();
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(&group_id), |events| {
            GroupAggregate::from_events(&group_id, events).create(
                name,
                selectors,
                explicit_tool_ids,
                excluded_tool_ids,
                &correlation_id,
            )
        })
        .await?;
        log::info!("Group '{name}' was created as '{group_id}' by '{identity}'.");
        Ok(group_id)
    }

    /// Atomically replace a group's name and/or selector set.
    pub async fn update_tool_group(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
        name: Option<&str>,
        selectors: Option<&[ToolSelector]>,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events).update(name, selectors, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Append a selector to a group.
    pub async fn add_selector(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
        selector: &ToolSelector,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events).add_selector(selector, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Remove a selector from a group.
    pub async fn remove_selector(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
        selector: &ToolSelector,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events)
                .remove_selector(selector, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Explicitly add a tool to a group.
    pub async fn add_explicit_tool(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
        tool_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events)
                .add_explicit_tool(tool_id, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Remove an explicitly added tool from a group.
    pub async fn remove_explicit_tool(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
        tool_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events)
                .remove_explicit_tool(tool_id, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Exclude a tool from group membership regardless of selectors.
    pub async fn exclude_tool(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
        tool_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events).exclude_tool(tool_id, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Lift a tool exclusion.
    pub async fn include_tool(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
        tool_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events).include_tool(tool_id, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Activate a group so that policies can grant it.
    pub async fn activate_group(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events).activate(&correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Deactivate a group without deleting its curation.
    pub async fn deactivate_group(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events).deactivate(&correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Delete a group.
    pub async fn delete_group(
        &self,
        identity: &AgentIdentity,
        group_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&GroupAggregate::stream_id(group_id), |events| {
            GroupAggregate::from_events(group_id, events).delete(&correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        log::info!("Group '{group_id}' was deleted by '{identity}'.");
        Ok(())
    }
}
