//! Application State
//!
//! Shared state across all handlers.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use dispatch_agent_agent::TrackerRegistry;
use dispatch_agent_config::Settings;
use dispatch_agent_core::StructuredExtractor;
use dispatch_agent_extraction::ExtractionPipeline;
use dispatch_agent_persistence::CallStore;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub store: Arc<dyn CallStore>,
    /// Live conversation trackers, one per call
    pub trackers: Arc<TrackerRegistry>,
    pub pipeline: Arc<ExtractionPipeline>,
    /// Present when metrics are enabled
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(settings: Settings, store: Arc<dyn CallStore>, extractor: Arc<dyn StructuredExtractor>) -> Self {
        let trackers = Arc::new(TrackerRegistry::new(settings.tracker));
        let pipeline = Arc::new(ExtractionPipeline::new(extractor, store.clone()));

        Self {
            settings: Arc::new(settings),
            store,
            trackers,
            pipeline,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Webhook secret, when signature checks are enabled
    pub fn webhook_secret(&self) -> Option<&str> {
        self.settings
            .webhook
            .secret
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }
}
