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

//! Result of scraping a [super::MetricsProvider].

use crate::metric::Metric;

/// Holds the result of scraping a [super::MetricsProvider].
#[derive(Clone, Debug)]
pub struct MetricsResult {
    app_component_name: String,
    metrics: Vec<Metric>,
}

impl Default for MetricsResult {
    fn default() -> Self {
        Self::new("app_default")
    }
}

impl MetricsResult {
    /// Return a new instance.
    ///
    /// The provided `app_component_name` will be used as prefix to the metric
    /// name.
    pub fn new(app_component_name: &str) -> Self {
        Self {
            app_component_name: app_component_name.to_string(),
            metrics: vec![],
        }
    }

    /// Builder style append of a [Metric] to this result.
    pub fn add_metric(mut self, metric: Metric) -> MetricsResult {
        self.metrics.push(metric);
        self
    }

    /// Provides the metric in the `PrometheusText0.0.4` format.
    pub fn as_text(&self) -> String {
        let mut ret = String::new();
        for metric in self.metrics.iter() {
            ret.push_str(metric.as_text(&self.app_component_name).as_str());
            ret.push('\n');
        }
        ret
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metric::MetricLabeledValue;
    use crate::metric::MetricType;

    #[test]
    fn prometheus_text_rendering() {
        let metric_result = MetricsResult::new("toolgate_gw")
            .add_metric(
                Metric::from_metric_labeled_values(
                    "invocations_count",
                    &[
                        MetricLabeledValue::new(3.0)
                            .add_label("source", "pizzeria".to_owned())
                            .add_label("outcome", "success".to_owned()),
                        MetricLabeledValue::new(1.0)
                            .add_label("source", "pizzeria".to_owned())
                            .add_label("outcome", "upstream_failure".to_owned()),
                    ],
                )
                .set_type(MetricType::Counter)
                .set_help("Tool invocations by outcome."),
            );
        let text = metric_result.as_text();
        assert!(text.contains("# TYPE toolgate_gw_invocations_count counter"));
        assert!(
            text.contains(
                "toolgate_gw_invocations_count{source=\"pizzeria\",outcome=\"success\"} 3"
            )
        );
    }
}
