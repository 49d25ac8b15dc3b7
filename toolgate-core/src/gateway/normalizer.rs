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

//! Normalization of OpenAPI documents into tool descriptors.

use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashSet;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::ParameterLocation;
use toolgate_store::model::ToolDocument;
use toolgate_store::model::ToolParameter;

/// HTTP methods recognized as operations in a path item.
const OPERATION_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// The normalized projection of one OpenAPI document.
#[derive(Debug)]
pub struct NormalizedInventory {
    /// One descriptor per operation.
    pub tools: Vec<ToolDocument>,
    /// First `servers` entry, when the document declares one.
    pub server_url: Option<String>,
}

/** Normalizer of OpenAPI 3.0/3.1 documents.

Turns each operation into one [ToolDocument]. The raw document is only held
during normalization; nothing but the normalized projection is kept.

`$ref` is followed for internal `#/components/...` references only; an
external reference rejects the document.
*/
pub struct OpenApiNormalizer;

impl OpenApiNormalizer {
    /// Normalize an OpenAPI document, provided as JSON or YAML bytes.
    pub fn normalize(
        spec_bytes: &[u8],
        source_id: &str,
    ) -> Result<NormalizedInventory, GatewayError> {
        let document = Self::parse_document(spec_bytes)?;
        let openapi_version = document
            .get("openapi")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !openapi_version.starts_with("3.") {
            return Err(GatewayErrorKind::SpecRejected.error_with_msg(format!(
                "Unsupported OpenAPI version '{openapi_version}'. Only 3.x is accepted."
            )));
        }
        let empty_paths = serde_json::Map::new();
        let paths = document
            .get("paths")
            .and_then(Value::as_object)
            .unwrap_or(&empty_paths);
        let mut tools = Vec::new();
        let mut seen_operation_ids = HashSet::new();
        for (path_template, path_item) in paths {
            let path_item = Self::resolve_ref(&document, path_item)?;
            let path_parameters = path_item
                .get("parameters")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for method in OPERATION_METHODS {
                let Some(operation) = path_item.get(method) else {
                    continue;
                };
                let tool = Self::normalize_operation(
                    &document,
                    source_id,
                    path_template,
                    method,
                    operation,
                    &path_parameters,
                )?;
                if !seen_operation_ids.insert(tool.operation_id.to_owned()) {
                    return Err(GatewayErrorKind::SpecRejected.error_with_msg(format!(
                        "Duplicate operation id '{}' in OpenAPI document.",
                        tool.operation_id
                    )));
                }
                tools.push(tool);
            }
        }
        let server_url = document
            .pointer("/servers/0/url")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Ok(NormalizedInventory { tools, server_url })
    }

    /// Parse the document bytes as JSON with a YAML fallback.
    fn parse_document(spec_bytes: &[u8]) -> Result<Value, GatewayError> {
        if let Ok(document) = serde_json::from_slice::<Value>(spec_bytes) {
            return Ok(document);
        }
        serde_yaml::from_slice::<Value>(spec_bytes).map_err(|e| {
            GatewayErrorKind::SpecRejected
                .error_with_msg(format!("Document is neither valid JSON nor YAML: {e}"))
        })
    }

    /// Normalize one operation into a [ToolDocument].
    fn normalize_operation(
        document: &Value,
        source_id: &str,
        path_template: &str,
        method: &str,
        operation: &Value,
        path_parameters: &[Value],
    ) -> Result<ToolDocument, GatewayError> {
        let operation_id = operation
            .get("operationId")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| Self::derived_operation_id(method, path_template));
        let summary = operation
            .get("summary")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let tags = operation
            .get("tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let mut parameters = Vec::new();
        let operation_parameters = operation
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        // Operation level parameters override path level ones of the same
        // name and location.
        for parameter in path_parameters.iter().chain(operation_parameters.iter()) {
            if let Some(parameter) = Self::normalize_parameter(document, parameter)? {
                parameters.retain(|existing: &ToolParameter| {
                    existing.name != parameter.name || existing.location != parameter.location
                });
                parameters.push(parameter);
            }
        }
        let request_body_schema = Self::request_body_schema(document, operation)?;
        let response_schemas = Self::response_schemas(document, operation)?;
        Ok(ToolDocument {
            tool_id: ToolDocument::tool_id_from(source_id, &operation_id),
            source_id: source_id.to_owned(),
            operation_id,
            http_method: method.to_uppercase(),
            path_template: path_template.to_owned(),
            summary,
            tags,
            parameters,
            request_body_schema,
            response_schemas,
            enabled: true,
            state_version: 0,
        })
    }

    /// Deterministic operation id for operations without `operationId`.
    fn derived_operation_id(method: &str, path_template: &str) -> String {
        format!("{method}_{path_template}")
            .chars()
            .map(|character| {
                if character.is_ascii_alphanumeric() {
                    character.to_ascii_lowercase()
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Normalize one parameter declaration. Cookie parameters are dropped.
    fn normalize_parameter(
        document: &Value,
        parameter: &Value,
    ) -> Result<Option<ToolParameter>, GatewayError> {
        let parameter = Self::resolve_ref(document, parameter)?;
        let Some(name) = parameter.get("name").and_then(Value::as_str) else {
            return Ok(None);
        };
        let location = match parameter.get("in").and_then(Value::as_str) {
            Some("path") => ParameterLocation::Path,
            Some("query") => ParameterLocation::Query,
            Some("header") => ParameterLocation::Header,
            _ => return Ok(None),
        };
        let required = location == ParameterLocation::Path
            || parameter
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false);
        let schema_type = parameter
            .get("schema")
            .map(|schema| Self::resolve_ref(document, schema))
            .transpose()?
            .and_then(|schema| {
                schema
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| "string".to_owned());
        Ok(Some(ToolParameter {
            name: name.to_owned(),
            location,
            required,
            schema_type,
        }))
    }

    /// Extract and inline the request body schema, preferring
    /// `application/json`.
    fn request_body_schema(
        document: &Value,
        operation: &Value,
    ) -> Result<Option<Value>, GatewayError> {
        let Some(request_body) = operation.get("requestBody") else {
            return Ok(None);
        };
        let request_body = Self::resolve_ref(document, request_body)?;
        Self::schema_of_content(document, request_body.get("content"))
    }

    /// Extract and inline documented response schemas by status code.
    fn response_schemas(
        document: &Value,
        operation: &Value,
    ) -> Result<BTreeMap<String, Value>, GatewayError> {
        let mut response_schemas = BTreeMap::new();
        let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
            return Ok(response_schemas);
        };
        for (status_code, response) in responses {
            let response = Self::resolve_ref(document, response)?;
            if let Some(schema) = Self::schema_of_content(document, response.get("content"))? {
                response_schemas.insert(status_code.to_owned(), schema);
            }
        }
        Ok(response_schemas)
    }

    /// Pick the JSON media type schema of a `content` map.
    fn schema_of_content(
        document: &Value,
        content: Option<&Value>,
    ) -> Result<Option<Value>, GatewayError> {
        let Some(content) = content.and_then(Value::as_object) else {
            return Ok(None);
        };
        let media_type = content
            .get("application/json")
            .or_else(|| content.values().next());
        let Some(schema) = media_type.and_then(|media_type| media_type.get("schema")) else {
            return Ok(None);
        };
        Ok(Some(Self::inline_schema(document, schema, &mut Vec::new())?))
    }

    /// Resolve a node that may be a `{"$ref": ...}` wrapper.
    fn resolve_ref<'a>(document: &'a Value, node: &'a Value) -> Result<&'a Value, GatewayError> {
        let Some(reference) = node.get("$ref").and_then(Value::as_str) else {
            return Ok(node);
        };
        let pointer = Self::internal_pointer(reference)?;
        document.pointer(&pointer).ok_or_else(|| {
            GatewayErrorKind::SpecRejected
                .error_with_msg(format!("Unresolvable reference '{reference}'."))
        })
    }

    /// Inline all internal references of a schema.
    ///
    /// Cyclic references terminate as the permissive empty schema.
    fn inline_schema(
        document: &Value,
        schema: &Value,
        visited: &mut Vec<String>,
    ) -> Result<Value, GatewayError> {
        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            if visited.iter().any(|seen| seen == reference) {
                return Ok(Value::Object(serde_json::Map::new()));
            }
            let pointer = Self::internal_pointer(reference)?;
            let target = document.pointer(&pointer).ok_or_else(|| {
                GatewayErrorKind::SpecRejected
                    .error_with_msg(format!("Unresolvable reference '{reference}'."))
            })?;
            visited.push(reference.to_owned());
            let inlined = Self::inline_schema(document, target, visited)?;
            visited.pop();
            return Ok(inlined);
        }
        match schema {
            Value::Object(entries) => {
                let mut inlined = serde_json::Map::with_capacity(entries.len());
                for (key, value) in entries {
                    inlined.insert(key.to_owned(), Self::inline_schema(document, value, visited)?);
                }
                Ok(Value::Object(inlined))
            }
            Value::Array(items) => {
                let mut inlined = Vec::with_capacity(items.len());
                for item in items {
                    inlined.push(Self::inline_schema(document, item, visited)?);
                }
                Ok(Value::Array(inlined))
            }
            other => Ok(other.to_owned()),
        }
    }

    /// Convert an internal `#/...` reference to a JSON pointer. External
    /// references reject the document.
    fn internal_pointer(reference: &str) -> Result<String, GatewayError> {
        reference
            .strip_prefix("#")
            .filter(|pointer| pointer.starts_with('/'))
            .map(str::to_owned)
            .ok_or_else(|| {
                GatewayErrorKind::SpecRejected.error_with_msg(format!(
                    "External reference '{reference}' is not allowed."
                ))
            })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn pizzeria_document() -> Value {
        json!({
            "openapi": "3.0.2",
            "info": { "title": "Pizzeria", "version": "1.0.0" },
            "servers": [{ "url": "http://svc:8000" }],
            "paths": {
                "/api/menu": {
                    "get": {
                        "operationId": "get_menu_items_api_menu_get",
                        "summary": "Get menu items",
                        "tags": ["menu"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Menu" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/api/orders/{order_id}": {
                    "parameters": [
                        { "name": "order_id", "in": "path", "required": true,
                          "schema": { "type": "string" } }
                    ],
                    "get": {
                        "operationId": "get_order",
                        "parameters": [
                            { "name": "verbose", "in": "query",
                              "schema": { "type": "boolean" } }
                        ],
                        "responses": { "200": { "description": "OK" } }
                    }
                },
                "/api/orders": {
                    "post": {
                        "summary": "Create an order",
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Order" }
                                }
                            }
                        },
                        "responses": { "201": { "description": "Created" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Menu": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/MenuItem" }
                    },
                    "MenuItem": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "price": { "type": "number" }
                        }
                    },
                    "Order": {
                        "type": "object",
                        "required": ["items"],
                        "properties": {
                            "items": { "type": "array", "items": { "type": "string" } }
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn normalizes_operations_with_inlined_schemas() {
        let bytes = serde_json::to_vec(&pizzeria_document()).unwrap();
        let inventory = OpenApiNormalizer::normalize(&bytes, "S1").unwrap();
        assert_eq!(inventory.server_url.as_deref(), Some("http://svc:8000"));
        let tools = inventory.tools;
        assert_eq!(tools.len(), 3);
        let menu = tools
            .iter()
            .find(|tool| tool.operation_id == "get_menu_items_api_menu_get")
            .unwrap();
        assert_eq!(menu.tool_id, "S1/get_menu_items_api_menu_get");
        assert_eq!(menu.http_method, "GET");
        assert_eq!(menu.path_template, "/api/menu");
        assert_eq!(menu.tags, vec!["menu".to_owned()]);
        // The $ref chain Menu -> MenuItem was fully inlined.
        let response = menu.response_schemas.get("200").unwrap();
        assert_eq!(
            response.pointer("/items/properties/name/type").unwrap(),
            &json!("string")
        );
    }

    #[test]
    fn merges_path_level_parameters() {
        let bytes = serde_json::to_vec(&pizzeria_document()).unwrap();
        let tools = OpenApiNormalizer::normalize(&bytes, "S1").unwrap().tools;
        let order = tools
            .iter()
            .find(|tool| tool.operation_id == "get_order")
            .unwrap();
        let names = order
            .parameters
            .iter()
            .map(|parameter| (parameter.name.as_str(), parameter.required))
            .collect::<Vec<_>>();
        assert!(names.contains(&("order_id", true)));
        assert!(names.contains(&("verbose", false)));
    }

    #[test]
    fn derives_operation_id_when_missing() {
        let bytes = serde_json::to_vec(&pizzeria_document()).unwrap();
        let tools = OpenApiNormalizer::normalize(&bytes, "S1").unwrap().tools;
        let create = tools
            .iter()
            .find(|tool| tool.http_method == "POST")
            .unwrap();
        assert_eq!(create.operation_id, "post__api_orders");
        assert!(create.request_body_schema.is_some());
    }

    #[test]
    fn accepts_yaml() {
        let yaml = r#"
openapi: "3.1.0"
info:
  title: Minimal
  version: "1"
paths:
  /ping:
    get:
      operationId: ping
      responses:
        "200":
          description: OK
"#;
        let inventory = OpenApiNormalizer::normalize(yaml.as_bytes(), "S1").unwrap();
        assert_eq!(inventory.tools.len(), 1);
        assert_eq!(inventory.tools[0].tool_id, "S1/ping");
        assert!(inventory.server_url.is_none());
    }

    #[test]
    fn rejects_external_references() {
        let mut document = pizzeria_document();
        document["paths"]["/api/orders"]["post"]["requestBody"]["content"]["application/json"]
            ["schema"] = json!({ "$ref": "https://example.com/schemas.json#/Order" });
        let bytes = serde_json::to_vec(&document).unwrap();
        let res = OpenApiNormalizer::normalize(&bytes, "S1");
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::SpecRejected);
    }

    #[test]
    fn rejects_duplicate_operation_ids() {
        let mut document = pizzeria_document();
        document["paths"]["/api/menu"]["get"]["operationId"] = json!("get_order");
        let bytes = serde_json::to_vec(&document).unwrap();
        let res = OpenApiNormalizer::normalize(&bytes, "S1");
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::SpecRejected);
    }

    #[test]
    fn rejects_non_3x_documents() {
        let bytes = br#"{ "swagger": "2.0", "paths": {} }"#;
        let res = OpenApiNormalizer::normalize(bytes, "S1");
        assert_eq!(res.unwrap_err().kind(), &GatewayErrorKind::SpecRejected);
    }

    #[test]
    fn cyclic_references_terminate() {
        let document = json!({
            "openapi": "3.0.0",
            "paths": {
                "/nodes": {
                    "post": {
                        "operationId": "create_node",
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/Node" }
                                }
                            }
                        },
                        "responses": {}
                    }
                }
            },
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "child": { "$ref": "#/components/schemas/Node" }
                        }
                    }
                }
            }
        });
        let bytes = serde_json::to_vec(&document).unwrap();
        let tools = OpenApiNormalizer::normalize(&bytes, "S1").unwrap().tools;
        let schema = tools[0].request_body_schema.as_ref().unwrap();
        assert_eq!(schema.pointer("/properties/child").unwrap(), &json!({}));
    }
}
