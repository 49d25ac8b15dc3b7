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

//! Access policy aggregate.

use super::event_types;
use serde_json::json;
use toolgate_store::model::ClaimMatcher;
use toolgate_store::model::DomainEvent;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::MatcherOp;
use toolgate_store::model::PendingEvent;
use toolgate_store::model::PolicyStatus;

/** Access policy aggregate.

Folded from the `policy-{id}` event stream.
*/
pub struct PolicyAggregate {
    policy_id: String,
    version: u64,
    exists: bool,
    deleted: bool,
    status: PolicyStatus,
    priority: i64,
}

impl PolicyAggregate {
    /// Journal stream identifier of a policy aggregate.
    pub fn stream_id(policy_id: &str) -> String {
        format!("policy-{policy_id}")
    }

    /// Fold the aggregate from its event stream.
    pub fn from_events(policy_id: &str, events: &[DomainEvent]) -> Self {
        let mut aggregate = Self {
            policy_id: policy_id.to_owned(),
            version: 0,
            exists: false,
            deleted: false,
            status: PolicyStatus::Inactive,
            priority: 0,
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
            event_types::POLICY_DEFINED => {
                self.exists = true;
                self.priority = payload
                    .get("priority")
                    .and_then(serde_json::Value::as_i64)
                    .unwrap_or_default();
            }
            event_types::POLICY_PRIORITY_CHANGED => {
                self.priority = payload
                    .get("priority")
                    .and_then(serde_json::Value::as_i64)
                    .unwrap_or(self.priority);
            }
            event_types::POLICY_ACTIVATED => {
                self.status = PolicyStatus::Active;
            }
            event_types::POLICY_DEACTIVATED => {
                self.status = PolicyStatus::Inactive;
            }
            event_types::POLICY_DELETED => {
                self.deleted = true;
            }
            event_types::POLICY_MATCHERS_UPDATED | event_types::POLICY_GROUPS_UPDATED => {}
            other => {
                log::debug!("Ignoring unknown event type '{other}' in policy stream.");
            }
        }
    }

    /// Current stream version for optimistic appends.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Return `true` when the aggregate holds a live policy.
    pub fn is_live(&self) -> bool {
        self.exists && !self.deleted
    }

    /// Decide definition of a new policy.
    ///
    /// A defined policy starts inactive and matches no one until it is
    /// activated.
    pub fn define(
        &self,
        name: &str,
        matchers: &[ClaimMatcher],
        group_ids: &[String],
        priority: i64,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        if self.exists {
            return Err(GatewayErrorKind::BusinessRule
                .error_with_msg(format!("Policy '{}' already exists.", self.policy_id)));
        }
        if name.trim().is_empty() {
            return Err(
                GatewayErrorKind::Validation.error_with_msg("Policy definition requires a name.")
            );
        }
        Self::assert_valid_matchers(matchers)?;
        Ok(vec![PendingEvent::new(
            event_types::POLICY_DEFINED,
            json!({
                "policy_id": self.policy_id,
                "name": name,
                "matchers": matchers,
                "group_ids": group_ids,
                "priority": priority,
            }),
            correlation_id,
        )])
    }

    /// Decide an atomic replacement of the matcher set.
    pub fn update_matchers(
        &self,
        matchers: &[ClaimMatcher],
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        Self::assert_valid_matchers(matchers)?;
        Ok(vec![PendingEvent::new(
            event_types::POLICY_MATCHERS_UPDATED,
            json!({ "policy_id": self.policy_id, "matchers": matchers }),
            correlation_id,
        )])
    }

    /// Decide an atomic replacement of the granted group set.
    pub fn update_groups(
        &self,
        group_ids: &[String],
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        Ok(vec![PendingEvent::new(
            event_types::POLICY_GROUPS_UPDATED,
            json!({ "policy_id": self.policy_id, "group_ids": group_ids }),
            correlation_id,
        )])
    }

    /// Decide a priority change. An unchanged priority is a no-op.
    pub fn change_priority(
        &self,
        priority: i64,
        correlation_id: &str,
    ) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if self.priority == priority {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::POLICY_PRIORITY_CHANGED,
            json!({ "policy_id": self.policy_id, "priority": priority }),
            correlation_id,
        )])
    }

    /// Decide activation. An active policy is a no-op.
    pub fn activate(&self, correlation_id: &str) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if self.status == PolicyStatus::Active {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::POLICY_ACTIVATED,
            json!({ "policy_id": self.policy_id }),
            correlation_id,
        )])
    }

    /// Decide deactivation. An inactive policy is a no-op.
    pub fn deactivate(&self, correlation_id: &str) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        if self.status == PolicyStatus::Inactive {
            return Ok(vec![]);
        }
        Ok(vec![PendingEvent::new(
            event_types::POLICY_DEACTIVATED,
            json!({ "policy_id": self.policy_id }),
            correlation_id,
        )])
    }

    /// Decide deletion.
    pub fn delete(&self, correlation_id: &str) -> Result<Vec<PendingEvent>, GatewayError> {
        self.assert_live()?;
        Ok(vec![PendingEvent::new(
            event_types::POLICY_DELETED,
            json!({ "policy_id": self.policy_id }),
            correlation_id,
        )])
    }

    fn assert_live(&self) -> Result<(), GatewayError> {
        if !self.is_live() {
            return Err(GatewayErrorKind::NotFound
                .error_with_msg(format!("Policy '{}' does not exist.", self.policy_id)));
        }
        Ok(())
    }

    /// Matcher operators constrain the shape of the comparison value.
    fn assert_valid_matchers(matchers: &[ClaimMatcher]) -> Result<(), GatewayError> {
        for matcher in matchers {
            if matcher.claim_path.trim().is_empty() {
                return Err(GatewayErrorKind::Validation
                    .error_with_msg("Matcher claim_path must not be empty."));
            }
            match matcher.op {
                MatcherOp::Exists => {}
                MatcherOp::In | MatcherOp::NotIn => {
                    if !matcher
                        .value
                        .as_ref()
                        .is_some_and(serde_json::Value::is_array)
                    {
                        return Err(GatewayErrorKind::Validation.error_with_msg(format!(
                            "Matcher op '{:?}' on '{}' requires a list value.",
                            matcher.op, matcher.claim_path
                        )));
                    }
                }
                _ => {
                    if matcher.value.is_none() {
                        return Err(GatewayErrorKind::Validation.error_with_msg(format!(
                            "Matcher op '{:?}' on '{}' requires a value.",
                            matcher.op, matcher.claim_path
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn matcher(claim_path: &str, op: MatcherOp, value: Option<serde_json::Value>) -> ClaimMatcher {
        ClaimMatcher {
            claim_path: claim_path.to_owned(),
            op,
            value,
        }
    }

    fn defined() -> (PolicyAggregate, Vec<DomainEvent>) {
        let empty = PolicyAggregate::from_events("p1", &[]);
        let pending = empty
            .define(
                "customers",
                &[matcher(
                    "realm_access.roles",
                    MatcherOp::Contains,
                    Some(serde_json::json!("customer")),
                )],
                &["g1".to_owned()],
                10,
                "c1",
            )
            .unwrap();
        let events = pending
            .iter()
            .enumerate()
            .map(|(i, event)| {
                DomainEvent::from_pending(&PolicyAggregate::stream_id("p1"), i as u64 + 1, event)
            })
            .collect::<Vec<_>>();
        (PolicyAggregate::from_events("p1", &events), events)
    }

    #[test]
    fn defined_policy_starts_inactive() {
        let (aggregate, _) = defined();
        assert!(aggregate.is_live());
        assert_eq!(aggregate.status, PolicyStatus::Inactive);
        assert!(!aggregate.activate("c2").unwrap().is_empty());
    }

    #[test]
    fn unchanged_priority_is_a_no_op() {
        let (aggregate, _) = defined();
        assert!(aggregate.change_priority(10, "c2").unwrap().is_empty());
        assert!(!aggregate.change_priority(20, "c2").unwrap().is_empty());
    }

    #[test]
    fn in_matcher_requires_a_list() {
        let empty = PolicyAggregate::from_events("p2", &[]);
        let res = empty.define(
            "bad",
            &[matcher("sub", MatcherOp::In, Some(serde_json::json!("alice")))],
            &[],
            0,
            "c1",
        );
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::Validation);
    }
}
