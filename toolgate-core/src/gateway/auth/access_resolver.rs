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

//! Claims-to-tools access resolution.

use super::claim_matching;
use super::resolver_cache::ResolverCache;
use super::selector_matching;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;
use toolgate_store::COLLECTION_GROUPS;
use toolgate_store::COLLECTION_POLICIES;
use toolgate_store::COLLECTION_SOURCES;
use toolgate_store::COLLECTION_TOOLS;
use toolgate_store::StoreProvider;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GroupDocument;
use toolgate_store::model::GroupStatus;
use toolgate_store::model::PolicyDocument;
use toolgate_store::model::PolicyStatus;
use toolgate_store::model::SourceDocument;
use toolgate_store::model::SourceStatus;
use toolgate_store::model::ToolDocument;
use toolgate_store::provider::facades::StoreProviderFacades;

/// The concrete access an agent's claims resolve to.
#[derive(Debug, Default)]
pub struct ResolvedAccess {
    /// Tools the agent may discover and invoke.
    pub tool_ids: BTreeSet<String>,
    /// Groups granted by matching policies, in evaluation order.
    pub group_ids: Vec<String>,
    /// Matching policies, in evaluation order.
    pub policy_ids: Vec<String>,
}

/** Joins agent claims, active policies, groups and tools into the set of
tools the agent is allowed to see and call.

Results are cached by a stable fingerprint of the claim subset that active
policies actually reference, so agents with equivalent claims share one
resolution.
*/
pub struct AccessResolver {
    store: Arc<StoreProvider>,
    cache: Arc<ResolverCache>,
}

impl AccessResolver {
    /// Return a new instance.
    pub async fn new(store: &Arc<StoreProvider>, cache_ttl_micros: u64) -> Arc<Self> {
        Arc::new(Self {
            store: Arc::clone(store),
            cache: ResolverCache::new(cache_ttl_micros).await,
        })
    }

    /// Drop all cached resolutions.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Resolve the set of tools the claims grant access to.
    ///
    /// Dangling group and tool references are silently dropped. A read-model
    /// failure yields [toolgate_store::model::GatewayErrorKind::Transient]
    /// and leaves the cache untouched.
    pub async fn resolve(&self, claims: &Value) -> Result<Arc<ResolvedAccess>, GatewayError> {
        let policies = self.active_policies().await?;
        let fingerprint = Self::claims_fingerprint(claims, &policies);
        if let Some(resolved) = self.cache.by_fingerprint(&fingerprint) {
            if log::log_enabled!(log::Level::Trace) {
                log::trace!("Access resolver cache hit for fingerprint '{fingerprint}'.");
            }
            return Ok(resolved);
        }
        let mut group_ids = Vec::new();
        let mut policy_ids = Vec::new();
        for policy in &policies {
            let matches = policy
                .matchers
                .iter()
                .all(|matcher| claim_matching::matcher_matches(matcher, claims));
            if matches {
                policy_ids.push(policy.policy_id.to_owned());
                for group_id in &policy.group_ids {
                    if !group_ids.contains(group_id) {
                        group_ids.push(group_id.to_owned());
                    }
                }
            }
        }
        let tool_ids = self.tools_of_groups(&group_ids).await?;
        let resolved = Arc::new(ResolvedAccess {
            tool_ids,
            group_ids,
            policy_ids,
        });
        self.cache.insert(&fingerprint, &resolved);
        Ok(resolved)
    }

    /// Load active policies sorted by `(priority desc, policy_id asc)`.
    async fn active_policies(&self) -> Result<Vec<PolicyDocument>, GatewayError> {
        let mut policies = self
            .store
            .read_model_facade()
            .documents_by_collection(COLLECTION_POLICIES)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<PolicyDocument>(document).ok())
            .filter(|policy| policy.status == PolicyStatus::Active)
            .collect::<Vec<_>>();
        policies.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.policy_id.cmp(&b.policy_id))
        });
        Ok(policies)
    }

    /// Build the stable SHA-256 fingerprint of the claim subset referenced
    /// by the active policies' matchers.
    fn claims_fingerprint(claims: &Value, policies: &[PolicyDocument]) -> String {
        let mut referenced = BTreeMap::new();
        for policy in policies {
            for matcher in &policy.matchers {
                let resolved = claim_matching::resolve_claim_path(claims, &matcher.claim_path)
                    .cloned()
                    .unwrap_or(Value::Null);
                referenced.insert(matcher.claim_path.to_owned(), resolved);
            }
        }
        // BTreeMap keys serialize sorted, which makes the JSON canonical.
        let canonical = serde_json::to_string(&referenced).unwrap_or_default();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    /// Resolve the union of tool sets of the provided groups.
    async fn tools_of_groups(
        &self,
        group_ids: &[String],
    ) -> Result<BTreeSet<String>, GatewayError> {
        let read_model = self.store.read_model_facade();
        let groups = read_model
            .documents_by_collection(COLLECTION_GROUPS)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<GroupDocument>(document).ok())
            .map(|group| (group.group_id.to_owned(), group))
            .collect::<HashMap<_, _>>();
        let active_sources = read_model
            .documents_by_collection(COLLECTION_SOURCES)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<SourceDocument>(document).ok())
            .filter(|source| source.status == SourceStatus::Active)
            .map(|source| source.source_id)
            .collect::<BTreeSet<_>>();
        let tools = read_model
            .documents_by_collection(COLLECTION_TOOLS)
            .await?
            .iter()
            .filter_map(|document| serde_json::from_str::<ToolDocument>(document).ok())
            .collect::<Vec<_>>();
        let mut tool_ids = BTreeSet::new();
        for group_id in group_ids {
            // Dangling group references are self-healing: skip silently.
            let Some(group) = groups.get(group_id) else {
                continue;
            };
            if group.status != GroupStatus::Active {
                continue;
            }
            let mut members = BTreeSet::new();
            if !group.selectors.is_empty() {
                for tool in &tools {
                    if group
                        .selectors
                        .iter()
                        .all(|selector| selector_matching::selector_matches(selector, tool))
                    {
                        members.insert(tool.tool_id.to_owned());
                    }
                }
            }
            for tool_id in &group.explicit_tool_ids {
                if tools.iter().any(|tool| &tool.tool_id == tool_id) {
                    members.insert(tool_id.to_owned());
                }
            }
            for tool_id in &group.excluded_tool_ids {
                members.remove(tool_id);
            }
            // Only enabled tools of active sources are ever granted.
            for tool_id in members {
                let eligible = tools.iter().any(|tool| {
                    tool.tool_id == tool_id
                        && tool.enabled
                        && active_sources.contains(&tool.source_id)
                });
                if eligible {
                    tool_ids.insert(tool_id);
                }
            }
        }
        Ok(tool_ids)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use toolgate_store::model::AuthMode;
    use toolgate_store::model::ClaimMatcher;
    use toolgate_store::model::MatcherOp;
    use toolgate_store::model::SelectorKind;
    use toolgate_store::model::ToolSelector;
    use toolgate_store_mem::InMemStoreProvider;

    async fn store_with_fixture() -> Arc<StoreProvider> {
        let provider = InMemStoreProvider::new().await;
        let store = Arc::new(provider.as_store_provider());
        let read_model = store.read_model_facade();
        let source = SourceDocument {
            source_id: "S1".to_owned(),
            name: "Pizzeria".to_owned(),
            spec_url: "http://svc/openapi.json".to_owned(),
            base_url: Some("http://svc".to_owned()),
            auth_mode: AuthMode::TokenExchange,
            default_audience: Some("pizzeria-backend".to_owned()),
            status: SourceStatus::Active,
            inventory_version: 1,
            last_refreshed_at: None,
            state_version: 1,
        };
        read_model
            .document_upsert(
                COLLECTION_SOURCES,
                "S1",
                &serde_json::to_string(&source).unwrap(),
            )
            .await
            .unwrap();
        for (operation_id, method, tags, enabled) in [
            ("get_menu_items_api_menu_get", "GET", vec!["menu"], true),
            ("get_secret_menu", "GET", vec!["menu"], true),
            ("create_order", "POST", vec!["orders"], true),
            ("get_retired", "GET", vec!["menu"], false),
        ] {
            let tool = ToolDocument {
                tool_id: ToolDocument::tool_id_from("S1", operation_id),
                source_id: "S1".to_owned(),
                operation_id: operation_id.to_owned(),
                http_method: method.to_owned(),
                path_template: "/api/menu".to_owned(),
                summary: None,
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
                parameters: vec![],
                request_body_schema: None,
                response_schemas: Default::default(),
                enabled,
                state_version: 1,
            };
            read_model
                .document_upsert(
                    COLLECTION_TOOLS,
                    &tool.tool_id,
                    &serde_json::to_string(&tool).unwrap(),
                )
                .await
                .unwrap();
        }
        let group = GroupDocument {
            group_id: "G1".to_owned(),
            name: "menu".to_owned(),
            selectors: vec![
                ToolSelector {
                    kind: SelectorKind::Tag,
                    pattern: "menu".to_owned(),
                },
                ToolSelector {
                    kind: SelectorKind::Method,
                    pattern: "GET".to_owned(),
                },
            ],
            explicit_tool_ids: vec![],
            excluded_tool_ids: vec!["S1/get_secret_menu".to_owned()],
            status: GroupStatus::Active,
            state_version: 1,
        };
        read_model
            .document_upsert(
                COLLECTION_GROUPS,
                "G1",
                &serde_json::to_string(&group).unwrap(),
            )
            .await
            .unwrap();
        let policy = PolicyDocument {
            policy_id: "P1".to_owned(),
            name: "customers".to_owned(),
            matchers: vec![ClaimMatcher {
                claim_path: "realm_access.roles".to_owned(),
                op: MatcherOp::Contains,
                value: Some(json!("customer")),
            }],
            group_ids: vec!["G1".to_owned(), "G-missing".to_owned()],
            priority: 10,
            status: PolicyStatus::Active,
            state_version: 1,
        };
        read_model
            .document_upsert(
                COLLECTION_POLICIES,
                "P1",
                &serde_json::to_string(&policy).unwrap(),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn selector_and_semantics_with_exclusion() {
        let store = store_with_fixture().await;
        let resolver = AccessResolver::new(&store, 60_000_000).await;
        let claims = json!({ "sub": "a", "realm_access": { "roles": ["customer"] } });
        let resolved = resolver.resolve(&claims).await.unwrap();
        // Tagged "menu" AND method GET, minus the exclusion, minus disabled.
        assert!(resolved.tool_ids.contains("S1/get_menu_items_api_menu_get"));
        assert!(!resolved.tool_ids.contains("S1/get_secret_menu"));
        assert!(!resolved.tool_ids.contains("S1/create_order"));
        assert!(!resolved.tool_ids.contains("S1/get_retired"));
        assert_eq!(resolved.policy_ids, vec!["P1".to_owned()]);
        // Dangling group reference was dropped silently.
        assert_eq!(resolved.group_ids, vec!["G1".to_owned(), "G-missing".to_owned()]);
    }

    #[tokio::test]
    async fn non_matching_claims_resolve_to_nothing() {
        let store = store_with_fixture().await;
        let resolver = AccessResolver::new(&store, 60_000_000).await;
        let claims = json!({ "sub": "b", "realm_access": { "roles": ["other"] } });
        let resolved = resolver.resolve(&claims).await.unwrap();
        assert!(resolved.tool_ids.is_empty());
        assert!(resolved.policy_ids.is_empty());
    }

    #[tokio::test]
    async fn identical_claims_resolve_identically() {
        let store = store_with_fixture().await;
        let resolver = AccessResolver::new(&store, 60_000_000).await;
        let claims_a = json!({ "sub": "a", "realm_access": { "roles": ["customer"] } });
        // Same referenced claim subset, different irrelevant claims.
        let claims_b =
            json!({ "sub": "b", "aud": "x", "realm_access": { "roles": ["customer"] } });
        let first = resolver.resolve(&claims_a).await.unwrap();
        let second = resolver.resolve(&claims_b).await.unwrap();
        assert_eq!(first.tool_ids, second.tool_ids);
        // The fingerprint only covers referenced claims, so the second
        // resolution was a cache hit on the same Arc.
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn empty_matcher_set_matches_all_agents() {
        let store = store_with_fixture().await;
        let read_model = store.read_model_facade();
        let policy = PolicyDocument {
            policy_id: "P0".to_owned(),
            name: "everyone".to_owned(),
            matchers: vec![],
            group_ids: vec!["G1".to_owned()],
            priority: 99,
            status: PolicyStatus::Active,
            state_version: 1,
        };
        read_model
            .document_upsert(
                COLLECTION_POLICIES,
                "P0",
                &serde_json::to_string(&policy).unwrap(),
            )
            .await
            .unwrap();
        let resolver = AccessResolver::new(&store, 60_000_000).await;
        let resolved = resolver.resolve(&json!({ "sub": "anyone" })).await.unwrap();
        assert!(resolved.policy_ids.contains(&"P0".to_owned()));
        assert!(resolved.tool_ids.contains("S1/get_menu_items_api_menu_get"));
    }

    #[tokio::test]
    async fn priority_orders_policies_with_id_tie_break() {
        let store = store_with_fixture().await;
        let read_model = store.read_model_facade();
        for (policy_id, priority) in [("P3", 10), ("P2", 10), ("P9", 50)] {
            let policy = PolicyDocument {
                policy_id: policy_id.to_owned(),
                name: policy_id.to_owned(),
                matchers: vec![],
                group_ids: vec![],
                priority,
                status: PolicyStatus::Active,
                state_version: 1,
            };
            read_model
                .document_upsert(
                    COLLECTION_POLICIES,
                    policy_id,
                    &serde_json::to_string(&policy).unwrap(),
                )
                .await
                .unwrap();
        }
        let resolver = AccessResolver::new(&store, 60_000_000).await;
        let resolved = resolver
            .resolve(&json!({ "sub": "x", "realm_access": { "roles": ["customer"] } }))
            .await
            .unwrap();
        assert_eq!(
            resolved.policy_ids,
            vec![
                "P9".to_owned(),
                "P1".to_owned(),
                "P2".to_owned(),
                "P3".to_owned()
            ]
        );
    }
}
