//! Normalizes per-flow counters exported by an external packet-level
//! simulator into the common scenario metric shape.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use wifi_lab_abstract::{LinkRates, PacketCounts, ScenarioMetrics};

/// Counters of one flow as reported by the simulator's flow monitor.
/// Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowRecord {
    #[serde(default)]
    pub flow_id: u32,
    /// Address classification; carried for diagnostics only.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub protocol: Option<u8>,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub rx_bytes: u64,
    pub delay_sum: f64,
    pub time_first_tx_packet: f64,
    pub time_last_rx_packet: f64,
}

impl FlowRecord {
    /// `rxBytes * 8 / active duration / 1000`, or `None` when the flow has no
    /// positive active duration.
    pub fn throughput_kbps(&self) -> Option<f64> {
        let duration = self.time_last_rx_packet - self.time_first_tx_packet;
        (duration > 0.0 && duration.is_finite())
            .then(|| self.rx_bytes as f64 * 8.0 / duration / 1000.0)
    }

    /// Mean one-way delay in milliseconds, or `None` when nothing was received
    /// or the delay sum is negative or not finite.
    pub fn mean_delay_ms(&self) -> Option<f64> {
        (self.rx_packets > 0 && self.delay_sum >= 0.0 && self.delay_sum.is_finite())
            .then(|| self.delay_sum / self.rx_packets as f64 * 1000.0)
    }

    pub fn lost_packets(&self) -> u64 {
        self.tx_packets.saturating_sub(self.rx_packets)
    }
}

/// On-disk flow dump: `{ "flows": [ ... ] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowDump {
    pub flows: Vec<FlowRecord>,
}

impl FlowDump {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read flow dump {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse flow dump {}", path.display()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowSummary {
    pub metrics: ScenarioMetrics,
    pub flow_count: usize,
    pub throughput_flows: usize,
    pub delay_flows: usize,
}

/// Averages throughput and delay over the flows that qualify for each, and
/// derives loss from the totals across all flows.
pub fn summarize_flows(flows: &[FlowRecord]) -> FlowSummary {
    let throughputs: Vec<f64> = flows.iter().filter_map(FlowRecord::throughput_kbps).collect();
    let delays: Vec<f64> = flows.iter().filter_map(FlowRecord::mean_delay_ms).collect();

    let sent: u64 = flows.iter().map(|f| f.tx_packets).sum();
    let lost: u64 = flows.iter().map(FlowRecord::lost_packets).sum();
    let packets = PacketCounts::from_sent_and_lost(sent, lost);

    for flow in flows {
        debug!(
            flow_id = flow.flow_id,
            source = flow.source.as_deref().unwrap_or("?"),
            destination = flow.destination.as_deref().unwrap_or("?"),
            tx = flow.tx_packets,
            rx = flow.rx_packets,
            "flow counters"
        );
    }

    let throughput_kbps = mean_or_zero(&throughputs, "throughput");
    let delay_ms = mean_or_zero(&delays, "delay");
    let packet_loss_percent = if packets.sent > 0 {
        packets.lost as f64 / packets.sent as f64 * 100.0
    } else {
        warn!("no packets sent across {} flows; reporting 0% loss", flows.len());
        0.0
    };

    FlowSummary {
        metrics: ScenarioMetrics::new(
            LinkRates {
                throughput_kbps,
                delay_ms,
                packet_loss_percent,
            },
            packets,
        ),
        flow_count: flows.len(),
        throughput_flows: throughputs.len(),
        delay_flows: delays.len(),
    }
}

fn mean_or_zero(values: &[f64], what: &str) -> f64 {
    if values.is_empty() {
        warn!("no flow qualifies for {what}; reporting 0");
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(tx: u64, rx: u64, rx_bytes: u64, delay_sum: f64, first: f64, last: f64) -> FlowRecord {
        FlowRecord {
            flow_id: 1,
            source: Some("192.168.0.2".into()),
            destination: Some("10.1.1.1".into()),
            protocol: Some(17),
            tx_packets: tx,
            rx_packets: rx,
            rx_bytes,
            delay_sum,
            time_first_tx_packet: first,
            time_last_rx_packet: last,
        }
    }

    #[test]
    fn test_per_flow_formulas() {
        let f = flow(100, 80, 50_000, 0.4, 1.0, 5.0);
        assert_eq!(f.throughput_kbps(), Some(100.0));
        assert!((f.mean_delay_ms().unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(f.lost_packets(), 20);
    }

    #[test]
    fn test_unqualified_flows_are_excluded_from_means() {
        let flows = vec![
            flow(100, 80, 50_000, 0.4, 1.0, 5.0),
            // never received: no duration, no delay
            flow(50, 0, 0, 0.0, 2.0, 0.0),
            flow(100, 100, 100_000, 0.2, 1.0, 3.0),
        ];
        let summary = summarize_flows(&flows);
        assert_eq!(summary.flow_count, 3);
        assert_eq!(summary.throughput_flows, 2);
        assert_eq!(summary.delay_flows, 2);
        assert!((summary.metrics.throughput_kbps - 250.0).abs() < 1e-9);
        assert!((summary.metrics.delay_ms - 3.5).abs() < 1e-9);
        assert_eq!(summary.metrics.packets_sent, 250);
        assert_eq!(summary.metrics.packets_lost, 70);
        assert_eq!(summary.metrics.packets_received, 180);
        assert!((summary.metrics.packet_loss_percent - 28.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_delay_sum_is_excluded() {
        let bad = flow(10, 10, 5_000, -0.5, 1.0, 2.0);
        assert_eq!(bad.mean_delay_ms(), None);
        assert_eq!(flow(10, 10, 5_000, f64::NAN, 1.0, 2.0).mean_delay_ms(), None);

        let summary = summarize_flows(&[bad.clone()]);
        assert_eq!(summary.delay_flows, 0);
        assert!(summary.metrics.delay_ms >= 0.0);

        let mixed = summarize_flows(&[bad, flow(10, 10, 5_000, 0.03, 1.0, 2.0)]);
        assert_eq!(mixed.delay_flows, 1);
        assert!((mixed.metrics.delay_ms - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_nothing_sent_reports_zero_loss() {
        let summary = summarize_flows(&[flow(0, 0, 0, 0.0, 0.0, 0.0)]);
        assert_eq!(summary.metrics.packet_loss_percent, 0.0);
        assert_eq!(summary.metrics.throughput_kbps, 0.0);
        assert_eq!(summary.metrics.delay_ms, 0.0);

        let empty = summarize_flows(&[]);
        assert_eq!(empty.metrics.packets_sent, 0);
        assert_eq!(empty.metrics.packet_loss_percent, 0.0);
    }

    #[test]
    fn test_parse_flow_dump_json() {
        let json = r#"{
            "flows": [
                { "flowId": 3, "source": "192.168.0.5", "destination": "10.1.1.1",
                  "txPackets": 10, "rxPackets": 9, "rxBytes": 4608,
                  "delaySum": 0.018, "timeFirstTxPacket": 1.0, "timeLastRxPacket": 2.0 },
                { "txPackets": 4, "rxPackets": 4, "rxBytes": 6000,
                  "delaySum": 0.004, "timeFirstTxPacket": 1.5, "timeLastRxPacket": 1.5 }
            ]
        }"#;
        let dump: FlowDump = serde_json::from_str(json).unwrap();
        assert_eq!(dump.flows.len(), 2);
        assert_eq!(dump.flows[0].flow_id, 3);
        assert_eq!(dump.flows[1].source, None);
        assert_eq!(dump.flows[1].throughput_kbps(), None);
    }
}
