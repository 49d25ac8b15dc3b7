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

//! Read-model queries. Queries never mutate.

use super::Gateway;
use super::auth::AgentIdentity;
use toolgate_store::COLLECTION_GROUPS;
use toolgate_store::COLLECTION_POLICIES;
use toolgate_store::COLLECTION_SOURCES;
use toolgate_store::COLLECTION_TOOLS;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GroupDocument;
use toolgate_store::model::PolicyDocument;
use toolgate_store::model::SourceDocument;
use toolgate_store::model::ToolDocument;
use toolgate_store::provider::facades::StoreProviderFacades;

/// Largest accepted page size.
const MAX_PAGE_SIZE: usize = 200;

/// One page of a listing.
#[derive(Debug)]
pub struct DocumentPage<T> {
    /// The page items.
    pub items: Vec<T>,
    /// Total matches across all pages.
    pub total: u64,
}

/// Filters of the tool listing.
#[derive(Debug, Default)]
pub struct ToolsFilter {
    /// Only tools of this source.
    pub source_id: Option<String>,
    /// Only tools carrying this tag.
    pub tag: Option<String>,
    /// Only tools with this enabled flag.
    pub enabled: Option<bool>,
}

impl Gateway {
    /// List tools with filters and pagination, sorted by tool id.
    pub async fn tools_page(
        &self,
        filter: &ToolsFilter,
        page: usize,
        page_size: usize,
    ) -> Result<DocumentPage<ToolDocument>, GatewayError> {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let page = std::cmp::max(page, 1);
        let mut tools = self
            .store
            .read_model_facade()
            .documents_by_collection(COLLECTION_TOOLS)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<ToolDocument>(document).ok())
            .filter(|tool| {
                filter
                    .source_id
                    .as_ref()
                    .is_none_or(|source_id| &tool.source_id == source_id)
                    && filter
                        .tag
                        .as_ref()
                        .is_none_or(|tag| tool.tags.contains(tag))
                    && filter.enabled.is_none_or(|enabled| tool.enabled == enabled)
            })
            .collect::<Vec<_>>();
        tools.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
        let total = tools.len() as u64;
        let items = tools
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();
        Ok(DocumentPage { items, total })
    }

    /// The tools the identity's claims resolve to, sorted by tool id.
    pub async fn agent_tools(
        &self,
        identity: &AgentIdentity,
    ) -> Result<Vec<ToolDocument>, GatewayError> {
        let resolved = self.resolver.resolve(identity.claims()).await?;
        let mut tools = self
            .store
            .read_model_facade()
            .documents_by_collection(COLLECTION_TOOLS)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<ToolDocument>(document).ok())
            .filter(|tool| resolved.tool_ids.contains(&tool.tool_id))
            .collect::<Vec<_>>();
        tools.sort_by(|a, b| a.tool_id.cmp(&b.tool_id));
        Ok(tools)
    }

    /// List registered sources, sorted by name.
    pub async fn sources_list(
        &self,
        identity: &AgentIdentity,
    ) -> Result<Vec<SourceDocument>, GatewayError> {
        self.assert_admin(identity)?;
        let mut sources = self
            .store
            .read_model_facade()
            .documents_by_collection(COLLECTION_SOURCES)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<SourceDocument>(document).ok())
            .collect::<Vec<_>>();
        sources.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sources)
    }

    /// List tool groups, sorted by name.
    pub async fn groups_list(
        &self,
        identity: &AgentIdentity,
    ) -> Result<Vec<GroupDocument>, GatewayError> {
        self.assert_admin(identity)?;
        let mut groups = self
            .store
            .read_model_facade()
            .documents_by_collection(COLLECTION_GROUPS)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<GroupDocument>(document).ok())
            .collect::<Vec<_>>();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    /// List access policies, sorted by `(priority desc, id asc)`.
    pub async fn policies_list(
        &self,
        identity: &AgentIdentity,
    ) -> Result<Vec<PolicyDocument>, GatewayError> {
        self.assert_admin(identity)?;
        let mut policies = self
            .store
            .read_model_facade()
            .documents_by_collection(COLLECTION_POLICIES)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<PolicyDocument>(document).ok())
            .collect::<Vec<_>>();
        policies.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.policy_id.cmp(&b.policy_id))
        });
        Ok(policies)
    }
}
