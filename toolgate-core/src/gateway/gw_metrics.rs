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

//! Provide metrics for the [super::Gateway].

use crate::AppConfig;
use crossbeam_skiplist::SkipMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use toolgate_metrics::metric::Metric;
use toolgate_metrics::metric::MetricLabeledValue;
use toolgate_metrics::metric::MetricType;
use toolgate_metrics::registry::MetricsProvider;
use toolgate_metrics::registry::MetricsProviderRegistry;
use toolgate_metrics::registry::MetricsResult;
use toolgate_metrics::registry::MetricsResultFuture;
use toolgate_metrics::util::AtomicMetricAverage;

/// Provide metrics for the [super::Gateway].
pub struct GatewayMetrics {
    app_version: String,
    invocations: SkipMap<String, AtomicU64>,
    invocation_latency_by_source_avg: SkipMap<String, AtomicMetricAverage>,
    invocation_latency_by_source_max: SkipMap<String, Arc<AtomicU64>>,
    inventory_refreshes: SkipMap<String, AtomicU64>,
}

impl GatewayMetrics {
    const METRIC_COMPONENT_NAME: &str = "gw";
    const METRIC_NAME_INVOCATIONS: &str = "invocations_count";
    const METRIC_NAME_INVOCATION_LATENCY_AVG: &str = "invocation_latency_avg_millis";
    const METRIC_NAME_INVOCATION_LATENCY_MAX: &str = "invocation_latency_max_micros";
    const METRIC_NAME_REFRESHES: &str = "inventory_refreshes_count";
    const METRIC_NAME_VERSION: &str = "appname_build_info";
    const METRIC_LABEL_SOURCE: &str = "source";
    const METRIC_LABEL_OUTCOME: &str = "outcome";
    const METRIC_LABEL_VERSION: &str = "version";

    /// Return a new instance.
    pub(super) fn new(app_config: &AppConfig) -> Arc<Self> {
        let instance = Arc::new(Self {
            app_version: app_config.app_version().to_owned(),
            invocations: SkipMap::default(),
            invocation_latency_by_source_avg: SkipMap::default(),
            invocation_latency_by_source_max: SkipMap::default(),
            inventory_refreshes: SkipMap::default(),
        });
        MetricsProviderRegistry::register_metrics(
            app_config.app_name_lowercase(),
            Self::METRIC_COMPONENT_NAME,
            Arc::clone(&instance) as Arc<dyn MetricsProvider>,
        );
        instance
    }

    /// Count one tool invocation outcome for a source.
    pub(super) fn inc_invocation(&self, source_id: &str, outcome: &str) {
        let key = format!("{source_id};{outcome}");
        // Note: Only alloc String when entry is missing during first check.
        self.invocations
            .get(&key)
            .unwrap_or_else(|| self.invocations.get_or_insert_with(key, AtomicU64::default))
            .value()
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Track how long one upstream invocation took.
    pub(super) fn report_invocation_latency_micros(&self, source_id: &str, latency_micros: u64) {
        self.invocation_latency_by_source_avg
            .get(source_id)
            .unwrap_or_else(|| {
                self.invocation_latency_by_source_avg
                    .get_or_insert_with(source_id.to_string(), AtomicMetricAverage::default)
            })
            .value()
            // Convert latency to millis
            .append_with_cap(latency_micros / 1000);
        let value = self
            .invocation_latency_by_source_max
            .get(source_id)
            .unwrap_or_else(|| {
                self.invocation_latency_by_source_max
                    .get_or_insert_with(source_id.to_string(), Arc::default)
            })
            .value()
            .clone();
        // Note: This is _not_ atomic as a whole, but good enough for metrics.
        let current = value.load(Ordering::Relaxed);
        if current < latency_micros {
            value.store(latency_micros, Ordering::Relaxed);
        }
    }

    /// Count one inventory refresh of a source.
    pub(super) fn inc_inventory_refresh(&self, source_id: &str) {
        self.inventory_refreshes
            .get_or_insert_with(source_id.to_string(), AtomicU64::default)
            .value()
            .fetch_add(1, Ordering::Relaxed);
    }

    fn mlvs_from_invocations(&self) -> Vec<MetricLabeledValue> {
        let mut mlvs = vec![];
        for entry in self.invocations.iter() {
            let (source_id, outcome) = entry.key().split_once(';').unwrap_or((entry.key(), ""));
            let metric_value = entry.value().load(Ordering::Relaxed) as f64;
            mlvs.push(
                MetricLabeledValue::new(metric_value)
                    .add_label(Self::METRIC_LABEL_SOURCE, source_id.to_owned())
                    .add_label(Self::METRIC_LABEL_OUTCOME, outcome.to_owned()),
            )
        }
        if mlvs.is_empty() {
            mlvs.push(MetricLabeledValue::new(0f64));
        }
        mlvs
    }

    fn mlvs_from_by_source_count(map: &SkipMap<String, AtomicU64>) -> Vec<MetricLabeledValue> {
        let mut mlvs = vec![];
        for entry in map.iter() {
            let metric_value = entry.value().load(Ordering::Relaxed) as f64;
            mlvs.push(
                MetricLabeledValue::new(metric_value)
                    .add_label(Self::METRIC_LABEL_SOURCE, entry.key().to_owned()),
            )
        }
        if mlvs.is_empty() {
            mlvs.push(MetricLabeledValue::new(0f64));
        }
        mlvs
    }

    fn mlvs_from_by_source_gauge_avg(
        map: &SkipMap<String, AtomicMetricAverage>,
    ) -> Vec<MetricLabeledValue> {
        let mut mlvs = vec![];
        for entry in map.iter() {
            // Reset value when read
            let metric_value = entry.value().get_and_reset() as f64;
            mlvs.push(
                MetricLabeledValue::new(metric_value)
                    .add_label(Self::METRIC_LABEL_SOURCE, entry.key().to_owned()),
            )
        }
        if mlvs.is_empty() {
            mlvs.push(MetricLabeledValue::new(0f64));
        }
        mlvs
    }

    fn mlvs_from_by_source_gauge_max(
        map: &SkipMap<String, Arc<AtomicU64>>,
    ) -> Vec<MetricLabeledValue> {
        let mut mlvs = vec![];
        for entry in map.iter() {
            let metric_value = entry.value().swap(0, Ordering::Relaxed) as f64;
            mlvs.push(
                MetricLabeledValue::new(metric_value)
                    .add_label(Self::METRIC_LABEL_SOURCE, entry.key().to_owned()),
            )
        }
        if mlvs.is_empty() {
            mlvs.push(MetricLabeledValue::new(0f64));
        }
        mlvs
    }
}

impl MetricsProvider for GatewayMetrics {
    fn metrics(&self, metrics_result: MetricsResult) -> MetricsResultFuture {
        let metrics_result = metrics_result
            .add_metric(
                Metric::from_metric_labeled_value(
                    Self::METRIC_NAME_VERSION,
                    MetricLabeledValue::new(1f64)
                        .add_label(Self::METRIC_LABEL_VERSION, self.app_version.to_owned()),
                )
                .set_type(MetricType::Gauge)
                .set_help("Application version."),
            )
            .add_metric(
                Metric::from_metric_labeled_values(
                    Self::METRIC_NAME_INVOCATIONS,
                    &self.mlvs_from_invocations(),
                )
                .set_type(MetricType::Counter)
                .set_help("Tool invocations by source and outcome."),
            )
            .add_metric(
                Metric::from_metric_labeled_values(
                    Self::METRIC_NAME_INVOCATION_LATENCY_AVG,
                    &Self::mlvs_from_by_source_gauge_avg(&self.invocation_latency_by_source_avg),
                )
                .set_type(MetricType::Gauge)
                .set_help("Average upstream invocation latency since last scrape."),
            )
            .add_metric(
                Metric::from_metric_labeled_values(
                    Self::METRIC_NAME_INVOCATION_LATENCY_MAX,
                    &Self::mlvs_from_by_source_gauge_max(&self.invocation_latency_by_source_max),
                )
                .set_type(MetricType::Gauge)
                .set_help("Peak upstream invocation latency since last scrape."),
            )
            .add_metric(
                Metric::from_metric_labeled_values(
                    Self::METRIC_NAME_REFRESHES,
                    &Self::mlvs_from_by_source_count(&self.inventory_refreshes),
                )
                .set_type(MetricType::Counter)
                .set_help("Inventory refreshes by source."),
            );
        MetricsResultFuture::from_future(async move { metrics_result })
    }
}
