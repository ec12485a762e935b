//! Web Vitals and resource-timing collection for the developer overlay.
//!
//! Design:
//! - [`VitalsProducer`]: cheap, cloneable handle that pushes [`PerfEvent`]s into
//!   a bounded channel; never blocks, drops (and counts) when full
//! - [`VitalsCollector`]: task that folds events into an aggregate and
//!   publishes immutable [`VitalsSnapshot`]s on a watch channel
//! - [`PerfBudget`]: size/request limits checked on every snapshot
//!
//! Nothing here knows about a particular timing API; callers translate their
//! observer callbacks into events.

use crate::config::PerfConfig;
use crate::utils::is_truthy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Core Web Vitals plus supporting paint/network metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VitalMetric {
    /// Largest Contentful Paint (ms)
    Lcp,
    /// First Contentful Paint (ms)
    Fcp,
    /// Cumulative Layout Shift (unitless)
    Cls,
    /// Interaction to Next Paint (ms)
    Inp,
    /// Time To First Byte (ms)
    Ttfb,
}

impl VitalMetric {
    pub const ALL: [VitalMetric; 5] = [Self::Lcp, Self::Fcp, Self::Cls, Self::Inp, Self::Ttfb];

    /// (good upper bound, poor lower bound)
    pub fn thresholds(self) -> (f64, f64) {
        match self {
            Self::Lcp => (2500.0, 4000.0),
            Self::Fcp => (1800.0, 3000.0),
            Self::Cls => (0.1, 0.25),
            Self::Inp => (200.0, 500.0),
            Self::Ttfb => (800.0, 1800.0),
        }
    }

    pub fn rate(self, value: f64) -> Rating {
        let (good, poor) = self.thresholds();
        if value <= good {
            Rating::Good
        } else if value <= poor {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        }
    }

    /// CLS accumulates; the others report their latest value
    fn accumulates(self) -> bool {
        matches!(self, Self::Cls)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

/// Resource category derived from the initiator / file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Script,
    Style,
    Image,
    Font,
    Fetch,
    Other,
}

impl ResourceKind {
    /// Classify by URL extension, ignoring query strings
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "js" | "mjs" | "cjs" => Self::Script,
            "css" => Self::Style,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "avif" | "svg" => Self::Image,
            "woff" | "woff2" | "ttf" | "otf" => Self::Font,
            "json" => Self::Fetch,
            _ => Self::Other,
        }
    }
}

/// One observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PerfEvent {
    Vital {
        metric: VitalMetric,
        value: f64,
    },
    Resource {
        name: String,
        kind: ResourceKind,
        transfer_bytes: u64,
        duration_ms: f64,
    },
}

/// Size and request limits (KiB)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfBudget {
    pub script_kib: u64,
    pub style_kib: u64,
    pub image_kib: u64,
    pub font_kib: u64,
    pub total_kib: u64,
    pub max_requests: usize,
}

impl Default for PerfBudget {
    fn default() -> Self {
        Self {
            script_kib: 300,
            style_kib: 80,
            image_kib: 800,
            font_kib: 150,
            total_kib: 1500,
            max_requests: 60,
        }
    }
}

impl PerfBudget {
    fn limit_for(&self, kind: ResourceKind) -> Option<u64> {
        match kind {
            ResourceKind::Script => Some(self.script_kib),
            ResourceKind::Style => Some(self.style_kib),
            ResourceKind::Image => Some(self.image_kib),
            ResourceKind::Font => Some(self.font_kib),
            ResourceKind::Fetch | ResourceKind::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalReading {
    pub value: f64,
    pub rating: Rating,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTotals {
    pub count: usize,
    pub transfer_bytes: u64,
    pub slowest_ms: f64,
}

/// What exceeded its budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "budget", rename_all = "lowercase")]
pub enum BudgetViolation {
    Kind {
        kind: ResourceKind,
        used_kib: u64,
        limit_kib: u64,
    },
    Total {
        used_kib: u64,
        limit_kib: u64,
    },
    Requests {
        used: usize,
        limit: usize,
    },
}

/// Immutable aggregate published after every event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsSnapshot {
    pub vitals: BTreeMap<VitalMetric, VitalReading>,
    pub resources: BTreeMap<ResourceKind, ResourceTotals>,
    pub requests: usize,
    pub transfer_bytes: u64,
    pub violations: Vec<BudgetViolation>,
    pub events_seen: u64,
}

impl VitalsSnapshot {
    fn apply(&mut self, event: PerfEvent) {
        self.events_seen += 1;
        match event {
            PerfEvent::Vital { metric, value } => {
                let value = match self.vitals.get(&metric) {
                    Some(prev) if metric.accumulates() => prev.value + value,
                    _ => value,
                };
                self.vitals.insert(
                    metric,
                    VitalReading {
                        value,
                        rating: metric.rate(value),
                    },
                );
            }
            PerfEvent::Resource {
                kind,
                transfer_bytes,
                duration_ms,
                ..
            } => {
                let totals = self.resources.entry(kind).or_default();
                totals.count += 1;
                totals.transfer_bytes += transfer_bytes;
                totals.slowest_ms = totals.slowest_ms.max(duration_ms);
                self.requests += 1;
                self.transfer_bytes += transfer_bytes;
            }
        }
    }

    fn check(&mut self, budget: &PerfBudget) {
        let mut violations = Vec::new();
        for (kind, totals) in &self.resources {
            if let Some(limit_kib) = budget.limit_for(*kind) {
                let used_kib = totals.transfer_bytes / 1024;
                if used_kib > limit_kib {
                    violations.push(BudgetViolation::Kind {
                        kind: *kind,
                        used_kib,
                        limit_kib,
                    });
                }
            }
        }
        let used_kib = self.transfer_bytes / 1024;
        if used_kib > budget.total_kib {
            violations.push(BudgetViolation::Total {
                used_kib,
                limit_kib: budget.total_kib,
            });
        }
        if self.requests > budget.max_requests {
            violations.push(BudgetViolation::Requests {
                used: self.requests,
                limit: budget.max_requests,
            });
        }
        self.violations = violations;
    }

    pub fn within_budget(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Producer side of the collector
#[derive(Debug, Clone)]
pub struct VitalsProducer {
    tx: mpsc::Sender<PerfEvent>,
    dropped: Arc<AtomicU64>,
}

impl VitalsProducer {
    /// Queue an event. Returns false when it was dropped.
    pub fn record(&self, event: PerfEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::debug!("Vitals channel full, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn vital(&self, metric: VitalMetric, value: f64) -> bool {
        self.record(PerfEvent::Vital { metric, value })
    }

    pub fn resource(&self, name: impl Into<String>, transfer_bytes: u64, duration_ms: f64) -> bool {
        let name = name.into();
        let kind = ResourceKind::from_url(&name);
        self.record(PerfEvent::Resource {
            name,
            kind,
            transfer_bytes,
            duration_ms,
        })
    }

    /// Events dropped because the channel was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Running collector task and its snapshot feed
pub struct VitalsCollector {
    snapshots: watch::Receiver<Arc<VitalsSnapshot>>,
    task: JoinHandle<()>,
}

impl VitalsCollector {
    /// Spawn a collector on the current tokio runtime.
    ///
    /// The task ends once every producer has been dropped.
    pub fn spawn(budget: PerfBudget, capacity: usize) -> (VitalsProducer, Self) {
        let (tx, mut rx) = mpsc::channel(capacity.max(1));
        let (snap_tx, snap_rx) = watch::channel(Arc::new(VitalsSnapshot::default()));

        let task = tokio::spawn(async move {
            let mut current = VitalsSnapshot::default();
            while let Some(event) = rx.recv().await {
                current.apply(event);
                current.check(&budget);
                if snap_tx.send(Arc::new(current.clone())).is_err() {
                    break;
                }
            }
            log::debug!("Vitals collector stopped after {} events", current.events_seen);
        });

        let producer = VitalsProducer {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (
            producer,
            Self {
                snapshots: snap_rx,
                task,
            },
        )
    }

    /// Latest published snapshot
    pub fn latest(&self) -> Arc<VitalsSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Receiver for overlay consumers
    pub fn subscribe(&self) -> watch::Receiver<Arc<VitalsSnapshot>> {
        self.snapshots.clone()
    }

    /// Wait for the task to drain after all producers are gone
    pub async fn finish(self) -> Arc<VitalsSnapshot> {
        let _ = self.task.await;
        self.snapshots.borrow().clone()
    }
}

/// Whether the developer overlay should show.
///
/// An explicit query value wins over the persisted flag.
pub fn overlay_enabled(query: &str, persisted: Option<&str>, config: &PerfConfig) -> bool {
    let query = query.trim_start_matches('?');
    let from_query = query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (key == config.query_param).then(|| is_truthy(value))
    });

    match from_query {
        Some(enabled) => enabled,
        None => persisted.is_some_and(|flag| !flag.is_empty() && is_truthy(flag)),
    }
}
