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

//! Access policy commands.

use super::Gateway;
use super::auth::AgentIdentity;
use super::domain::PolicyAggregate;
use toolgate_store::model::ClaimMatcher;
use toolgate_store::model::GatewayError;

impl Gateway {
    /// Define a new access policy. Returns the generated policy identifier.
    ///
    /// A defined policy starts inactive and grants nothing until activated.
    pub async fn define_access_policy(
        &self,
        identity: &AgentIdentity,
        name: &str,
        matchers: &[ClaimMatcher],
        group_ids: &[String],
        priority: i64,
    ) -> Result<String, GatewayError> {
        self.assert_admin(identity)?;
        let policy_id = uuid::Uuid::new_v4().to_string();
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&PolicyAggregate::stream_id(&policy_id), |events| {
            PolicyAggregate::from_events(&policy_id, events).define(
                name,
                matchers,
                group_ids,
                priority,
                &correlation_id,
            )
        })
        .await?;
        log::info!("Policy '{name}' was defined as '{policy_id}' by '{identity}'.");
        Ok(policy_id)
    }

    /// Atomically replace a policy's matcher set.
    pub async fn update_policy_matchers(
        &self,
        identity: &AgentIdentity,
        policy_id: &str,
        matchers: &[ClaimMatcher],
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&PolicyAggregate::stream_id(policy_id), |events| {
            PolicyAggregate::from_events(policy_id, events)
                .update_matchers(matchers, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Atomically replace a policy's granted group set.
    pub async fn update_policy_groups(
        &self,
        identity: &AgentIdentity,
        policy_id: &str,
        group_ids: &[String],
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&PolicyAggregate::stream_id(policy_id), |events| {
            PolicyAggregate::from_events(policy_id, events)
                .update_groups(group_ids, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Change a policy's evaluation priority.
    pub async fn change_policy_priority(
        &self,
        identity: &AgentIdentity,
        policy_id: &str,
        priority: i64,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&PolicyAggregate::stream_id(policy_id), |events| {
            PolicyAggregate::from_events(policy_id, events)
                .change_priority(priority, &correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Activate a policy so it participates in access resolution.
    pub async fn activate_policy(
        &self,
        identity: &AgentIdentity,
        policy_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&PolicyAggregate::stream_id(policy_id), |events| {
            PolicyAggregate::from_events(policy_id, events).activate(&correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Deactivate a policy without deleting it.
    pub async fn deactivate_policy(
        &self,
        identity: &AgentIdentity,
        policy_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&PolicyAggregate::stream_id(policy_id), |events| {
            PolicyAggregate::from_events(policy_id, events).deactivate(&correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        Ok(())
    }

    /// Delete a policy.
    pub async fn delete_policy(
        &self,
        identity: &AgentIdentity,
        policy_id: &str,
    ) -> Result<(), GatewayError> {
        self.assert_admin(identity)?;
        let correlation_id = uuid::Uuid::new_v4().to_string();
        self.handle_command(&PolicyAggregate::stream_id(policy_id), |events| {
            PolicyAggregate::from_events(policy_id, events).delete(&correlation_id)
        })
        .await?;
        self.invalidate_access_cache();
        log::info!("Policy '{policy_id}' was deleted by '{identity}'.");
        Ok(())
    }
}
