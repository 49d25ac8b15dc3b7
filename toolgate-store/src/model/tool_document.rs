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

//! Read-model document for one normalized source operation.

use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use utoipa::ToSchema;

/// Where an operation parameter is bound in the upstream request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ParameterLocation {
    /// Substituted into the path template.
    Path,
    /// Appended to the query string.
    Query,
    /// Sent as an HTTP header.
    Header,
}

/// One declared operation parameter.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolParameter {
    /// Parameter name as declared by the source.
    pub name: String,
    /// Binding location.
    pub location: ParameterLocation,
    /// Whether the invocation must provide the parameter.
    pub required: bool,
    /// Declared primitive type (`string` when the source omits one).
    pub schema_type: String,
}

/** Read-model projection of one normalized operation of a source.

`tool_id` is `{source_id}/{operation_id}` and `(source_id, operation_id)`
is unique.
*/
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolDocument {
    /// Globally unique tool identifier.
    pub tool_id: String,
    /// Owning source aggregate.
    pub source_id: String,
    /// Operation identifier, unique within the source.
    pub operation_id: String,
    /// Upstream HTTP method (upper case).
    pub http_method: String,
    /// Path template with `{parameter}` placeholders preserved.
    pub path_template: String,
    /// Operation summary, if the source declared one.
    pub summary: Option<String>,
    /// Operation tags.
    pub tags: Vec<String>,
    /// Declared path/query/header parameters.
    pub parameters: Vec<ToolParameter>,
    /// JSON Schema of the request body, if the operation takes one.
    pub request_body_schema: Option<serde_json::Value>,
    /// JSON Schemas of documented responses, by status code.
    pub response_schemas: BTreeMap<String, serde_json::Value>,
    /// Soft-disable flag. Survives inventory refreshes.
    pub enabled: bool,
    /// Optimistic concurrency token (sequence of the last applied event).
    pub state_version: u64,
}

impl ToolDocument {
    /// Compose the globally unique tool identifier.
    pub fn tool_id_from(source_id: &str, operation_id: &str) -> String {
        format!("{source_id}/{operation_id}")
    }
}
