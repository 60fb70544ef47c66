mod audit_channel;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use console_core::IntentCategory;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

pub use audit_channel::{spawn_audit_forwarder, ChannelAuditSink};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    requests_total: AtomicU64,
    classified_by_category: [AtomicU64; 5],
    rejected_components_total: AtomicU64,
    total_latency_micros: AtomicU64,
    latency_samples: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: IntentCategory,
    pub total: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub classifications_total: u64,
    pub fallback_total: u64,
    pub rejected_components_total: u64,
    pub by_category: Vec<CategoryCount>,
    pub latency_samples: u64,
    pub avg_latency_micros: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("console_requests_total").increment(1);
    }

    pub fn record_classification(&self, category: IntentCategory) {
        self.classified_by_category[category.index()].fetch_add(1, Ordering::Relaxed);
        metrics::counter!("console_classifications_total", "category" => category.as_str())
            .increment(1);
    }

    pub fn inc_rejected_component(&self) {
        self.rejected_components_total
            .fetch_add(1, Ordering::Relaxed);
        metrics::counter!("console_rejected_components_total").increment(1);
    }

    pub fn observe_latency(&self, duration: Duration) {
        self.total_latency_micros
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests_total.load(Ordering::Relaxed);
        let latency = self.total_latency_micros.load(Ordering::Relaxed);
        let samples = self.latency_samples.load(Ordering::Relaxed);
        let by_category = IntentCategory::ALL
            .into_iter()
            .map(|category| CategoryCount {
                category,
                total: self.classified_by_category[category.index()].load(Ordering::Relaxed),
            })
            .collect::<Vec<_>>();

        MetricsSnapshot {
            requests_total: requests,
            classifications_total: by_category.iter().map(|count| count.total).sum(),
            fallback_total: by_category[IntentCategory::Unsupported.index()].total,
            rejected_components_total: self.rejected_components_total.load(Ordering::Relaxed),
            by_category,
            latency_samples: samples,
            avg_latency_micros: if samples == 0 {
                0.0
            } else {
                latency as f64 / samples as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,console_agents=info,console_audit=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
