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

//! The tool invocation pipeline.

use super::Gateway;
use super::auth::AgentIdentity;
use super::invoker::BoundArguments;
use super::invoker::UpstreamReply;
use jsonschema::Draft;
use serde::Serialize;
use serde_json::Value;
use toolgate_store::COLLECTION_SOURCES;
use toolgate_store::COLLECTION_TOOLS;
use toolgate_store::model::AuthMode;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::ParameterLocation;
use toolgate_store::model::SourceDocument;
use toolgate_store::model::SourceStatus;
use toolgate_store::model::ToolDocument;
use toolgate_store::provider::facades::StoreProviderFacades;
use toolgate_store::time;

/// Arguments of one tool invocation, as submitted by the agent.
///
/// Keys bind to the tool's declared parameters by name; the request body
/// goes under the reserved `body` key.
pub type ToolArguments = Value;

/// One rejected argument.
///
/// Validation failures carry the full violation list serialized as the
/// error message so the HTTP surface can return it machine-readable.
#[derive(Debug, Serialize)]
struct Violation {
    field: String,
    reason: String,
}

impl Gateway {
    /// Execute a tool on behalf of an agent.
    ///
    /// Each pipeline step is a distinct failure boundary: authorization,
    /// source lookup, argument validation, credential acquisition, circuit
    /// check and the single upstream HTTP attempt.
    pub async fn execute_tool(
        &self,
        identity: &AgentIdentity,
        tool_id: &str,
        arguments: &ToolArguments,
    ) -> Result<UpstreamReply, GatewayError> {
        // Authorize.
        let resolved = self.resolver.resolve(identity.claims()).await?;
        if !resolved.tool_ids.contains(tool_id) {
            let msg = format!("Identity '{identity}' is not authorized to invoke '{tool_id}'.");
            log::info!("{msg}");
            return Err(GatewayErrorKind::Unauthorized.error_with_msg(msg));
        }
        // Resolve tool and source.
        let tool = self.tool_by_id(tool_id).await?;
        let source = self.active_source_by_id(&tool.source_id).await?;
        // Validate arguments.
        let bound = Self::bind_arguments(&tool, arguments)?;
        // Obtain the upstream credential.
        let bearer_token = match &source.auth_mode {
            AuthMode::None => None,
            AuthMode::BearerPassthrough => Some(identity.raw_token().to_owned()),
            AuthMode::TokenExchange => {
                let audience = source.default_audience.as_deref().unwrap_or_default();
                Some(
                    self.exchanger
                        .exchange(identity.raw_token(), audience, &[])
                        .await?,
                )
            }
        };
        // Circuit check.
        let breaker = self.breakers.source_breaker(&source.source_id);
        if !self.breakers.can_execute(&breaker).await {
            if let Some(metrics) = &self.metrics {
                metrics.inc_invocation(&source.source_id, "circuit_open");
            }
            return Err(GatewayErrorKind::CircuitOpen.error_with_msg(format!(
                "Circuit breaker of source '{}' is open.",
                source.source_id
            )));
        }
        // Execute. Exactly one network attempt.
        let start_micros = time::get_timestamp_micros();
        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "Invoking '{tool_id}' for '{identity}' (breaker: {}).",
                breaker.state().as_str()
            );
        }
        let result = self
            .invoker
            .execute(&source, &tool, &bound, bearer_token.as_deref())
            .await;
        let latency_micros = time::get_timestamp_micros() - start_micros;
        match result {
            Ok(reply) => {
                // An upstream 4xx passes through without a breaker count.
                self.breakers.record_outcome(&breaker, true, "ok").await;
                if let Some(metrics) = &self.metrics {
                    metrics.inc_invocation(&source.source_id, "success");
                    metrics.report_invocation_latency_micros(&source.source_id, latency_micros);
                }
                Ok(reply)
            }
            Err(e) => {
                self.breakers
                    .record_outcome(&breaker, false, &e.to_string())
                    .await;
                if let Some(metrics) = &self.metrics {
                    metrics.inc_invocation(&source.source_id, "upstream_failure");
                    metrics.report_invocation_latency_micros(&source.source_id, latency_micros);
                }
                Err(e)
            }
        }
    }

    /// Load a tool document by identifier.
    pub(crate) async fn tool_by_id(&self, tool_id: &str) -> Result<ToolDocument, GatewayError> {
        self.store
            .read_model_facade()
            .document_by_id(COLLECTION_TOOLS, tool_id)
            .await?
            .and_then(|document| serde_json::from_str(&document).ok())
            .ok_or_else(|| {
                GatewayErrorKind::NotFound
                    .error_with_msg(format!("No tool with id '{tool_id}'."))
            })
    }

    /// Load a source document that must be in the `active` status.
    async fn active_source_by_id(&self, source_id: &str) -> Result<SourceDocument, GatewayError> {
        let source: SourceDocument = self
            .store
            .read_model_facade()
            .document_by_id(COLLECTION_SOURCES, source_id)
            .await?
            .and_then(|document| serde_json::from_str(&document).ok())
            .ok_or_else(|| {
                GatewayErrorKind::NotFound
                    .error_with_msg(format!("No source with id '{source_id}'."))
            })?;
        if source.status != SourceStatus::Active {
            return Err(GatewayErrorKind::NotFound
                .error_with_msg(format!("Source '{source_id}' is not active.")));
        }
        Ok(source)
    }

    /// Bind submitted arguments to the tool's parameters and body schema.
    fn bind_arguments(
        tool: &ToolDocument,
        arguments: &ToolArguments,
    ) -> Result<BoundArguments, GatewayError> {
        let mut violations = Vec::new();
        let empty = serde_json::Map::new();
        let arguments = match arguments {
            Value::Object(entries) => entries,
            Value::Null => &empty,
            _ => {
                return Err(Self::validation_error(vec![Violation {
                    field: "arguments".to_owned(),
                    reason: "must be a JSON object".to_owned(),
                }]));
            }
        };
        let mut bound = BoundArguments::default();
        for parameter in &tool.parameters {
            match arguments.get(&parameter.name) {
                None => {
                    if parameter.required {
                        violations.push(Violation {
                            field: parameter.name.to_owned(),
                            reason: "required parameter is missing".to_owned(),
                        });
                    }
                }
                Some(value) => match Self::render_scalar(value) {
                    Some(rendered) => match parameter.location {
                        ParameterLocation::Path => {
                            bound.path.insert(parameter.name.to_owned(), rendered);
                        }
                        ParameterLocation::Query => {
                            bound.query.push((parameter.name.to_owned(), rendered));
                        }
                        ParameterLocation::Header => {
                            bound.headers.push((parameter.name.to_owned(), rendered));
                        }
                    },
                    None => violations.push(Violation {
                        field: parameter.name.to_owned(),
                        reason: "must be a scalar value".to_owned(),
                    }),
                },
            }
        }
        // Unknown top level fields are rejected outright.
        for name in arguments.keys() {
            let declared = name == "body"
                || tool
                    .parameters
                    .iter()
                    .any(|parameter| &parameter.name == name);
            if !declared {
                violations.push(Violation {
                    field: name.to_owned(),
                    reason: "unknown argument".to_owned(),
                });
            }
        }
        match (&tool.request_body_schema, arguments.get("body")) {
            (None, Some(_)) => violations.push(Violation {
                field: "body".to_owned(),
                reason: "operation does not take a request body".to_owned(),
            }),
            (None, None) => {}
            (Some(schema), body) => {
                let body = body.cloned().unwrap_or(Value::Object(serde_json::Map::new()));
                Self::validate_body(schema, &body, &mut violations);
                bound.body = Some(body);
            }
        }
        if violations.is_empty() {
            Ok(bound)
        } else {
            Err(Self::validation_error(violations))
        }
    }

    /// Validate the request body against the tool's schema.
    fn validate_body(schema: &Value, body: &Value, violations: &mut Vec<Violation>) {
        let compiled = match jsonschema::JSONSchema::options()
            .with_draft(Draft::Draft202012)
            .compile(schema)
        {
            Ok(compiled) => compiled,
            Err(e) => {
                log::warn!("Failed to compile request body schema: {e:?}");
                return;
            }
        };
        if let Err(errors) = compiled.validate(body) {
            for error in errors {
                violations.push(Violation {
                    field: format!("body{}", error.instance_path),
                    reason: error.to_string(),
                });
            }
        }
        // Unknown body fields are rejected unless the schema explicitly
        // allows additional properties.
        let explicitly_allowed = schema.get("additionalProperties").is_some();
        if let (Some(properties), Some(body), false) = (
            schema.get("properties").and_then(Value::as_object),
            body.as_object(),
            explicitly_allowed,
        ) {
            for name in body.keys() {
                if !properties.contains_key(name) {
                    violations.push(Violation {
                        field: format!("body/{name}"),
                        reason: "unknown field".to_owned(),
                    });
                }
            }
        }
    }

    /// Render a scalar argument for path/query/header binding.
    fn render_scalar(value: &Value) -> Option<String> {
        match value {
            Value::String(value) => Some(value.to_owned()),
            Value::Number(value) => Some(value.to_string()),
            Value::Bool(value) => Some(value.to_string()),
            _ => None,
        }
    }

    fn validation_error(violations: Vec<Violation>) -> GatewayError {
        GatewayErrorKind::Validation
            .error_with_msg(serde_json::to_string(&violations).unwrap_or_default())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use toolgate_store::model::ToolParameter;

    fn tool() -> ToolDocument {
        ToolDocument {
            tool_id: "S1/create_order".to_owned(),
            source_id: "S1".to_owned(),
            operation_id: "create_order".to_owned(),
            http_method: "POST".to_owned(),
            path_template: "/api/orders/{customer_id}".to_owned(),
            summary: None,
            tags: vec![],
            parameters: vec![
                ToolParameter {
                    name: "customer_id".to_owned(),
                    location: ParameterLocation::Path,
                    required: true,
                    schema_type: "string".to_owned(),
                },
                ToolParameter {
                    name: "dry_run".to_owned(),
                    location: ParameterLocation::Query,
                    required: false,
                    schema_type: "boolean".to_owned(),
                },
            ],
            request_body_schema: Some(json!({
                "type": "object",
                "required": ["items"],
                "properties": {
                    "items": { "type": "array", "items": { "type": "string" } },
                    "note": { "type": "string" }
                }
            })),
            response_schemas: Default::default(),
            enabled: true,
            state_version: 1,
        }
    }

    fn violations_of(error: GatewayError) -> Vec<(String, String)> {
        assert_eq!(error.kind(), &GatewayErrorKind::Validation);
        serde_json::from_str::<Vec<Value>>(error.message().unwrap())
            .unwrap()
            .iter()
            .map(|violation| {
                (
                    violation["field"].as_str().unwrap().to_owned(),
                    violation["reason"].as_str().unwrap().to_owned(),
                )
            })
            .collect()
    }

    #[test]
    fn binds_declared_parameters_and_body() {
        let arguments = json!({
            "customer_id": "c-7",
            "dry_run": true,
            "body": { "items": ["margherita"] }
        });
        let bound = Gateway::bind_arguments(&tool(), &arguments).unwrap();
        assert_eq!(bound.path.get("customer_id").unwrap(), "c-7");
        assert_eq!(bound.query, vec![("dry_run".to_owned(), "true".to_owned())]);
        assert_eq!(bound.body.unwrap()["items"][0], json!("margherita"));
    }

    #[test]
    fn missing_required_parameter_is_reported() {
        let arguments = json!({ "body": { "items": [] } });
        let violations = violations_of(Gateway::bind_arguments(&tool(), &arguments).unwrap_err());
        assert!(
            violations
                .iter()
                .any(|(field, reason)| field == "customer_id"
                    && reason.contains("required"))
        );
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let arguments = json!({ "customer_id": "c-7", "surprise": 1, "body": { "items": [] } });
        let violations = violations_of(Gateway::bind_arguments(&tool(), &arguments).unwrap_err());
        assert!(violations.iter().any(|(field, _)| field == "surprise"));
    }

    #[test]
    fn body_schema_violations_are_reported() {
        let arguments = json!({ "customer_id": "c-7", "body": { "note": "no items" } });
        let violations = violations_of(Gateway::bind_arguments(&tool(), &arguments).unwrap_err());
        assert!(violations.iter().any(|(field, _)| field.starts_with("body")));
    }

    #[test]
    fn unknown_body_field_is_rejected_without_additional_properties() {
        let arguments = json!({
            "customer_id": "c-7",
            "body": { "items": [], "extra": true }
        });
        let violations = violations_of(Gateway::bind_arguments(&tool(), &arguments).unwrap_err());
        assert!(
            violations
                .iter()
                .any(|(field, reason)| field == "body/extra" && reason == "unknown field")
        );
    }

    #[test]
    fn additional_properties_true_allows_unknown_body_fields() {
        let mut tool = tool();
        if let Some(schema) = tool.request_body_schema.as_mut() {
            schema["additionalProperties"] = json!(true);
        }
        let arguments = json!({
            "customer_id": "c-7",
            "body": { "items": [], "extra": true }
        });
        assert!(Gateway::bind_arguments(&tool, &arguments).is_ok());
    }
}
