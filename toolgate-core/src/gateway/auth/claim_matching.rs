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

//! Evaluation of claim matchers against a decoded token.

use serde_json::Value;
use toolgate_store::model::ClaimMatcher;
use toolgate_store::model::MatcherOp;

/// Resolve a dotted claim path to a value in the claims document.
///
/// A `null` value resolves like a missing claim.
pub fn resolve_claim_path<'a>(claims: &'a Value, claim_path: &str) -> Option<&'a Value> {
    let mut current = claims;
    for segment in claim_path.split('.') {
        current = current.get(segment)?;
    }
    if current.is_null() { None } else { Some(current) }
}

/// Return `true` if the matcher holds for the claims document.
///
/// A missing claim fails every operator except `ne` and `not_in`, and makes
/// `exists` explicitly false.
pub fn matcher_matches(matcher: &ClaimMatcher, claims: &Value) -> bool {
    let claim = resolve_claim_path(claims, &matcher.claim_path);
    match matcher.op {
        MatcherOp::Exists => claim.is_some(),
        MatcherOp::Eq => claim.is_some_and(|claim| scalar_eq(claim, matcher.value.as_ref())),
        MatcherOp::Ne => !claim.is_some_and(|claim| scalar_eq(claim, matcher.value.as_ref())),
        MatcherOp::In => claim.is_some_and(|claim| in_list(claim, matcher.value.as_ref())),
        MatcherOp::NotIn => !claim.is_some_and(|claim| in_list(claim, matcher.value.as_ref())),
        MatcherOp::Contains => claim.is_some_and(|claim| contains(claim, matcher.value.as_ref())),
        MatcherOp::Prefix => claim.is_some_and(|claim| {
            string_pair(claim, matcher.value.as_ref())
                .is_some_and(|(claim, value)| claim.starts_with(value))
        }),
        MatcherOp::Suffix => claim.is_some_and(|claim| {
            string_pair(claim, matcher.value.as_ref())
                .is_some_and(|(claim, value)| claim.ends_with(value))
        }),
    }
}

/// Type-strict scalar comparison of a claim and a matcher value.
fn scalar_eq(claim: &Value, value: Option<&Value>) -> bool {
    match (claim, value) {
        (Value::String(claim), Some(Value::String(value))) => claim == value,
        (Value::Number(claim), Some(Value::Number(value))) => claim == value,
        (Value::Bool(claim), Some(Value::Bool(value))) => claim == value,
        _ => false,
    }
}

/// Membership of the claim in the matcher's value list.
fn in_list(claim: &Value, value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_array)
        .is_some_and(|values| values.iter().any(|value| scalar_eq(claim, Some(value))))
}

/// Substring for string claims, membership for array claims.
fn contains(claim: &Value, value: Option<&Value>) -> bool {
    match claim {
        Value::String(claim) => value
            .and_then(Value::as_str)
            .is_some_and(|value| claim.contains(value)),
        Value::Array(items) => value.is_some_and(|value| {
            items.iter().any(|item| scalar_eq(item, Some(value)))
        }),
        _ => false,
    }
}

fn string_pair<'a>(claim: &'a Value, value: Option<&'a Value>) -> Option<(&'a str, &'a str)> {
    Some((claim.as_str()?, value?.as_str()?))
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn matcher(claim_path: &str, op: MatcherOp, value: Value) -> ClaimMatcher {
        ClaimMatcher {
            claim_path: claim_path.to_owned(),
            op,
            value: Some(value),
        }
    }

    #[test]
    fn contains_on_role_array() {
        let claims = json!({ "realm_access": { "roles": ["customer", "viewer"] } });
        assert!(matcher_matches(
            &matcher("realm_access.roles", MatcherOp::Contains, json!("customer")),
            &claims
        ));
        assert!(!matcher_matches(
            &matcher("realm_access.roles", MatcherOp::Contains, json!("admin")),
            &claims
        ));
    }

    #[test]
    fn contains_on_string_is_substring() {
        let claims = json!({ "email": "alice@example.com" });
        assert!(matcher_matches(
            &matcher("email", MatcherOp::Contains, json!("@example")),
            &claims
        ));
    }

    #[test]
    fn eq_is_type_strict() {
        let claims = json!({ "level": 42 });
        assert!(matcher_matches(&matcher("level", MatcherOp::Eq, json!(42)), &claims));
        assert!(!matcher_matches(&matcher("level", MatcherOp::Eq, json!("42")), &claims));
    }

    #[test]
    fn missing_claim_rules() {
        let claims = json!({ "sub": "alice" });
        // Fails every op ...
        assert!(!matcher_matches(&matcher("dept", MatcherOp::Eq, json!("x")), &claims));
        assert!(!matcher_matches(
            &matcher("dept", MatcherOp::Contains, json!("x")),
            &claims
        ));
        assert!(!matcher_matches(&matcher("dept", MatcherOp::Prefix, json!("x")), &claims));
        assert!(!matcher_matches(
            &ClaimMatcher {
                claim_path: "dept".to_owned(),
                op: MatcherOp::Exists,
                value: None,
            },
            &claims
        ));
        // ... except the negated ones.
        assert!(matcher_matches(&matcher("dept", MatcherOp::Ne, json!("x")), &claims));
        assert!(matcher_matches(
            &matcher("dept", MatcherOp::NotIn, json!(["x", "y"])),
            &claims
        ));
    }

    #[test]
    fn null_claim_counts_as_missing() {
        let claims = json!({ "dept": null });
        assert!(!matcher_matches(
            &ClaimMatcher {
                claim_path: "dept".to_owned(),
                op: MatcherOp::Exists,
                value: None,
            },
            &claims
        ));
    }

    #[test]
    fn prefix_and_suffix() {
        let claims = json!({ "sub": "service-account-pizzeria" });
        assert!(matcher_matches(
            &matcher("sub", MatcherOp::Prefix, json!("service-account-")),
            &claims
        ));
        assert!(matcher_matches(
            &matcher("sub", MatcherOp::Suffix, json!("pizzeria")),
            &claims
        ));
        assert!(!matcher_matches(
            &matcher("sub", MatcherOp::Prefix, json!("pizzeria")),
            &claims
        ));
    }
}
