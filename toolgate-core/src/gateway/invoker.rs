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

//! Execution of upstream HTTP calls on behalf of agents.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use toolgate_store::model::GatewayError;
use toolgate_store::model::GatewayErrorKind;
use toolgate_store::model::SourceDocument;
use toolgate_store::model::ToolDocument;

/// Arguments bound to a tool's declared parameters and body schema.
#[derive(Debug, Default)]
pub struct BoundArguments {
    /// Path parameter values by name.
    pub path: BTreeMap<String, String>,
    /// Query string entries.
    pub query: Vec<(String, String)>,
    /// Header entries.
    pub headers: Vec<(String, String)>,
    /// JSON request body.
    pub body: Option<Value>,
}

/// The upstream response as passed back to the caller.
#[derive(Debug)]
pub struct UpstreamReply {
    /// Upstream HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
    /// Upstream `Content-Type`, when present.
    pub content_type: Option<String>,
}

/** Per-source HTTP execution.

One shared connection pool serves all sources; the per-source failure
domain is the circuit breaker of the caller. Exactly one network attempt
is made per invocation. Retrying is the caller's decision, never the
gateway's.
*/
pub struct UpstreamInvoker {
    http_client: reqwest::Client,
}

impl UpstreamInvoker {
    /// Return a new instance.
    pub fn new(timeout_micros: u64) -> Arc<Self> {
        let http_client = reqwest::ClientBuilder::new()
            .user_agent(concat!("toolgate/", env!("CARGO_PKG_VERSION")))
            .referer(false)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(core::time::Duration::from_micros(timeout_micros))
            .build()
            .expect("Failed to construct upstream HTTP client.");
        Arc::new(Self { http_client })
    }

    /// Execute one upstream call.
    ///
    /// A reachable upstream yields `Ok` regardless of its status code;
    /// 5xx responses, timeouts and transport errors yield
    /// [GatewayErrorKind::UpstreamFailure] and count against the source's
    /// circuit breaker.
    pub async fn execute(
        &self,
        source: &SourceDocument,
        tool: &ToolDocument,
        bound: &BoundArguments,
        bearer_token: Option<&str>,
    ) -> Result<UpstreamReply, GatewayError> {
        let url = Self::render_url(source, tool, bound)?;
        let method = reqwest::Method::from_bytes(tool.http_method.as_bytes()).map_err(|_| {
            GatewayErrorKind::Unspecified
                .error_with_msg(format!("Invalid HTTP method '{}'.", tool.http_method))
        })?;
        let mut request = self.http_client.request(method, url).query(&bound.query);
        for (name, value) in &bound.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(bearer_token) = bearer_token {
            request = request.bearer_auth(bearer_token);
        }
        if let Some(body) = &bound.body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| {
            GatewayErrorKind::UpstreamFailure.error_with_msg(format!(
                "Upstream call for '{}' failed: {e}",
                tool.tool_id
            ))
        })?;
        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayErrorKind::UpstreamFailure.error_with_msg(format!(
                "Upstream for '{}' responded with HTTP {}.",
                tool.tool_id,
                status.as_u16()
            )));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                GatewayErrorKind::UpstreamFailure
                    .error_with_msg(format!("Failed to read upstream response body: {e}"))
            })?
            .to_vec();
        Ok(UpstreamReply {
            status: status.as_u16(),
            body,
            content_type,
        })
    }

    /// Substitute path parameters and join with the source base URL.
    fn render_url(
        source: &SourceDocument,
        tool: &ToolDocument,
        bound: &BoundArguments,
    ) -> Result<reqwest::Url, GatewayError> {
        let mut path = tool.path_template.to_owned();
        for (name, value) in &bound.path {
            path = path.replace(&format!("{{{name}}}"), value);
        }
        let base = Self::base_url(source)?;
        base.join(path.trim_start_matches('/')).map_err(|e| {
            GatewayErrorKind::Unspecified
                .error_with_msg(format!("Failed to build upstream URL: {e}"))
        })
    }

    /// Base URL of a source: the refreshed `servers` entry or the spec URL
    /// origin.
    fn base_url(source: &SourceDocument) -> Result<reqwest::Url, GatewayError> {
        let spec_url = reqwest::Url::parse(&source.spec_url).map_err(|e| {
            GatewayErrorKind::Unspecified
                .error_with_msg(format!("Source '{}' has an invalid spec_url: {e}", source.source_id))
        })?;
        let base = match &source.base_url {
            // A relative servers entry resolves against the spec URL.
            Some(base_url) => spec_url.join(base_url).map_err(|e| {
                GatewayErrorKind::Unspecified.error_with_msg(format!(
                    "Source '{}' has an invalid base_url: {e}",
                    source.source_id
                ))
            })?,
            None => {
                let mut origin = spec_url.to_owned();
                origin.set_path("/");
                origin.set_query(None);
                origin.set_fragment(None);
                origin
            }
        };
        // A trailing slash makes relative joins append instead of replace.
        if base.path().ends_with('/') {
            Ok(base)
        } else {
            reqwest::Url::parse(&format!("{base}/")).map_err(|e| {
                GatewayErrorKind::Unspecified
                    .error_with_msg(format!("Failed to normalize base URL: {e}"))
            })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use toolgate_store::model::AuthMode;
    use toolgate_store::model::ParameterLocation;
    use toolgate_store::model::SourceStatus;
    use toolgate_store::model::ToolParameter;

    fn source(base_url: Option<&str>) -> SourceDocument {
        SourceDocument {
            source_id: "S1".to_owned(),
            name: "Pizzeria".to_owned(),
            spec_url: "http://svc:8000/openapi.json".to_owned(),
            base_url: base_url.map(str::to_owned),
            auth_mode: AuthMode::None,
            default_audience: None,
            status: SourceStatus::Active,
            inventory_version: 1,
            last_refreshed_at: None,
            state_version: 1,
        }
    }

    fn tool() -> ToolDocument {
        ToolDocument {
            tool_id: "S1/get_order".to_owned(),
            source_id: "S1".to_owned(),
            operation_id: "get_order".to_owned(),
            http_method: "GET".to_owned(),
            path_template: "/api/orders/{order_id}".to_owned(),
            summary: None,
            tags: vec![],
            parameters: vec![ToolParameter {
                name: "order_id".to_owned(),
                location: ParameterLocation::Path,
                required: true,
                schema_type: "string".to_owned(),
            }],
            request_body_schema: None,
            response_schemas: Default::default(),
            enabled: true,
            state_version: 1,
        }
    }

    #[test]
    fn path_parameters_are_substituted() {
        let mut bound = BoundArguments::default();
        bound.path.insert("order_id".to_owned(), "42".to_owned());
        let url = UpstreamInvoker::render_url(&source(None), &tool(), &bound).unwrap();
        assert_eq!(url.as_str(), "http://svc:8000/api/orders/42");
    }

    #[test]
    fn explicit_base_url_wins_over_spec_origin() {
        let bound = {
            let mut bound = BoundArguments::default();
            bound.path.insert("order_id".to_owned(), "42".to_owned());
            bound
        };
        let url =
            UpstreamInvoker::render_url(&source(Some("http://backend:9000")), &tool(), &bound)
                .unwrap();
        assert_eq!(url.as_str(), "http://backend:9000/api/orders/42");
    }

    #[test]
    fn relative_base_url_resolves_against_spec_url() {
        let bound = {
            let mut bound = BoundArguments::default();
            bound.path.insert("order_id".to_owned(), "7".to_owned());
            bound
        };
        let url = UpstreamInvoker::render_url(&source(Some("/v2/")), &tool(), &bound).unwrap();
        assert_eq!(url.as_str(), "http://svc:8000/v2/api/orders/7");
    }
}
