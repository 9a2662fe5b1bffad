use crate::scenario::ScenarioKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three rate metrics compared across scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Throughput,
    Delay,
    PacketLoss,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Throughput, Metric::Delay, Metric::PacketLoss];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Throughput => "throughput",
            Metric::Delay => "delay",
            Metric::PacketLoss => "packet_loss",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Throughput => "kbps",
            Metric::Delay => "ms",
            Metric::PacketLoss => "%",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rates produced by a metric source before packet accounting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkRates {
    pub throughput_kbps: f64,
    pub delay_ms: f64,
    pub packet_loss_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PacketCounts {
    pub sent: u64,
    pub received: u64,
    pub lost: u64,
}

impl PacketCounts {
    /// Builds counts from the sent total; `lost` is capped at `sent` so the
    /// identity `sent = received + lost` always holds.
    pub fn from_sent_and_lost(sent: u64, lost: u64) -> Self {
        let lost = lost.min(sent);
        Self {
            sent,
            received: sent - lost,
            lost,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.received.checked_add(self.lost) == Some(self.sent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioMetrics {
    pub throughput_kbps: f64,
    pub delay_ms: f64,
    pub packet_loss_percent: f64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_lost: u64,
}

impl ScenarioMetrics {
    pub fn new(rates: LinkRates, packets: PacketCounts) -> Self {
        Self {
            throughput_kbps: rates.throughput_kbps,
            delay_ms: rates.delay_ms,
            packet_loss_percent: rates.packet_loss_percent,
            packets_sent: packets.sent,
            packets_received: packets.received,
            packets_lost: packets.lost,
        }
    }

    pub fn rates(&self) -> LinkRates {
        LinkRates {
            throughput_kbps: self.throughput_kbps,
            delay_ms: self.delay_ms,
            packet_loss_percent: self.packet_loss_percent,
        }
    }

    pub fn packets(&self) -> PacketCounts {
        PacketCounts {
            sent: self.packets_sent,
            received: self.packets_received,
            lost: self.packets_lost,
        }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Throughput => self.throughput_kbps,
            Metric::Delay => self.delay_ms,
            Metric::PacketLoss => self.packet_loss_percent,
        }
    }
}

/// Which path produced a record. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricOrigin {
    Synthetic,
    FlowMonitor,
}

impl MetricOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricOrigin::Synthetic => "synthetic",
            MetricOrigin::FlowMonitor => "flow-monitor",
        }
    }
}

impl fmt::Display for MetricOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored scenario result. Replaced whole, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub key: ScenarioKey,
    pub metrics: ScenarioMetrics,
    pub origin: MetricOrigin,
    pub duration_secs: f64,
}

/// Metrics as recovered from a stored artifact; absent fields stay `None`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PartialMetrics {
    pub throughput_kbps: Option<f64>,
    pub delay_ms: Option<f64>,
    pub packet_loss_percent: Option<f64>,
    pub packets_sent: Option<u64>,
    pub packets_received: Option<u64>,
    pub packets_lost: Option<u64>,
}

impl PartialMetrics {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Throughput => self.throughput_kbps,
            Metric::Delay => self.delay_ms,
            Metric::PacketLoss => self.packet_loss_percent,
        }
    }

    /// All six fields, or `None` if any is absent.
    pub fn complete(&self) -> Option<ScenarioMetrics> {
        Some(ScenarioMetrics {
            throughput_kbps: self.throughput_kbps?,
            delay_ms: self.delay_ms?,
            packet_loss_percent: self.packet_loss_percent?,
            packets_sent: self.packets_sent?,
            packets_received: self.packets_received?,
            packets_lost: self.packets_lost?,
        })
    }
}

impl From<ScenarioMetrics> for PartialMetrics {
    fn from(m: ScenarioMetrics) -> Self {
        Self {
            throughput_kbps: Some(m.throughput_kbps),
            delay_ms: Some(m.delay_ms),
            packet_loss_percent: Some(m.packet_loss_percent),
            packets_sent: Some(m.packets_sent),
            packets_received: Some(m.packets_received),
            packets_lost: Some(m.packets_lost),
        }
    }
}
