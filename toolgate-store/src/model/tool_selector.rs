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

//! Declarative tool membership rule.

use serde::Deserialize;
use serde::Serialize;
use utoipa::ToSchema;

/// The tool attribute a selector pattern is matched against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// The operation identifier.
    Name,
    /// The HTTP method.
    Method,
    /// The path template.
    Path,
    /// Any of the operation's tags.
    Tag,
    /// Any of the operation's tags (alias kept for imported rules).
    Label,
    /// The owning source identifier.
    Source,
}

/** Immutable membership rule of a tool group.

`pattern` is a case-insensitive glob (`*`/`?`) or, with a `regex:` prefix,
a regular expression. A tool is selected by a group only if it matches
every selector of that group.
*/
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ToolSelector {
    /// Matched tool attribute.
    pub kind: SelectorKind,
    /// Glob pattern or `regex:<expr>`.
    pub pattern: String,
}
