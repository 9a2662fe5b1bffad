//! Text layout of a per-scenario result artifact.
//!
//! The labels and their order are the parsing contract; everything before the
//! results block is informational.

use serde::Serialize;
use tracing::debug;
use wifi_lab_abstract::{ParseIssue, PartialMetrics, ResultRecord, ScenarioKey, ScenarioMetrics};

pub const THROUGHPUT_LABEL: &str = "Throughput médio";
pub const DELAY_LABEL: &str = "Delay médio";
pub const LOSS_LABEL: &str = "Taxa de perda";
pub const SENT_LABEL: &str = "Pacotes enviados";
pub const RECEIVED_LABEL: &str = "Pacotes recebidos";
pub const LOST_LABEL: &str = "Pacotes perdidos";

const RULE: &str = "==================================================";

pub fn render_artifact(record: &ResultRecord) -> String {
    let key = &record.key;
    let m = &record.metrics;
    format!(
        "Simulação WLAN - {name}\n\
         Origem: {origin}\n\
         \n\
         PARÂMETROS\n\
         {RULE}\n\
         Número de clientes: {clients}\n\
         Mobilidade: {mobility}\n\
         Aplicação: {traffic}\n\
         Tempo de simulação: {duration}s\n\
         \n\
         RESULTADOS\n\
         {RULE}\n\
         {THROUGHPUT_LABEL}: {throughput:.4} kbps\n\
         {DELAY_LABEL}: {delay:.4} ms\n\
         {LOSS_LABEL}: {loss:.4}%\n\
         {SENT_LABEL}: {sent}\n\
         {RECEIVED_LABEL}: {received}\n\
         {LOST_LABEL}: {lost}\n",
        name = key.canonical_name(),
        origin = record.origin,
        clients = key.clients(),
        mobility = key.mobility(),
        traffic = key.traffic(),
        duration = record.duration_secs,
        throughput = m.throughput_kbps,
        delay = m.delay_ms,
        loss = m.packet_loss_percent,
        sent = m.packets_sent,
        received = m.packets_received,
        lost = m.packets_lost,
    )
}

/// Metrics recovered from one artifact, with every problem found on the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRecord {
    pub key: ScenarioKey,
    pub metrics: PartialMetrics,
    pub issues: Vec<ParseIssue>,
}

impl ParsedRecord {
    pub fn unreadable(key: ScenarioKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            metrics: PartialMetrics::default(),
            issues: vec![ParseIssue::Unreadable {
                reason: reason.into(),
            }],
        }
    }

    pub fn is_complete(&self) -> bool {
        self.issues.is_empty() && self.metrics.complete().is_some()
    }

    pub fn complete_metrics(&self) -> Option<ScenarioMetrics> {
        if self.issues.is_empty() {
            self.metrics.complete()
        } else {
            None
        }
    }
}

/// Extracts metric fields by label. Unknown lines are ignored, trailing unit
/// text after the number is discarded, and a bad value leaves its field absent.
pub fn parse_artifact(key: ScenarioKey, text: &str) -> ParsedRecord {
    let mut metrics = PartialMetrics::default();
    let mut issues = Vec::new();

    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim();
        let value = value.trim();

        if label == THROUGHPUT_LABEL {
            set_once(&mut metrics.throughput_kbps, parse_rate(THROUGHPUT_LABEL, value, &mut issues));
        } else if label == DELAY_LABEL {
            set_once(&mut metrics.delay_ms, parse_rate(DELAY_LABEL, value, &mut issues));
        } else if label.starts_with(LOSS_LABEL) {
            let value = value.trim_end().trim_end_matches('%');
            set_once(&mut metrics.packet_loss_percent, parse_rate(LOSS_LABEL, value, &mut issues));
        } else if label == SENT_LABEL {
            set_once(&mut metrics.packets_sent, parse_count(SENT_LABEL, value, &mut issues));
        } else if label == RECEIVED_LABEL {
            set_once(&mut metrics.packets_received, parse_count(RECEIVED_LABEL, value, &mut issues));
        } else if label == LOST_LABEL {
            set_once(&mut metrics.packets_lost, parse_count(LOST_LABEL, value, &mut issues));
        }
    }

    check_domains(&mut metrics, &mut issues);

    let present = [
        (THROUGHPUT_LABEL, metrics.throughput_kbps.is_some()),
        (DELAY_LABEL, metrics.delay_ms.is_some()),
        (LOSS_LABEL, metrics.packet_loss_percent.is_some()),
        (SENT_LABEL, metrics.packets_sent.is_some()),
        (RECEIVED_LABEL, metrics.packets_received.is_some()),
        (LOST_LABEL, metrics.packets_lost.is_some()),
    ];
    for (label, is_present) in present {
        let already_reported = issues.iter().any(|issue| {
            matches!(issue,
                ParseIssue::InvalidNumber { field, .. } | ParseIssue::OutOfDomain { field, .. }
                    if *field == label)
        });
        if !is_present && !already_reported {
            issues.push(ParseIssue::MissingField { field: label });
        }
    }

    if let (Some(sent), Some(received), Some(lost)) =
        (metrics.packets_sent, metrics.packets_received, metrics.packets_lost)
        && received.checked_add(lost) != Some(sent)
    {
        issues.push(ParseIssue::InconsistentPackets {
            sent,
            received,
            lost,
        });
    }

    ParsedRecord {
        key,
        metrics,
        issues,
    }
}

fn set_once<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    } else if value.is_some() {
        debug!("duplicate field ignored");
    }
}

fn first_token(value: &str) -> &str {
    value.split_whitespace().next().unwrap_or("")
}

fn parse_rate(field: &'static str, value: &str, issues: &mut Vec<ParseIssue>) -> Option<f64> {
    let token = first_token(value).trim_end_matches('%');
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            issues.push(ParseIssue::InvalidNumber {
                field,
                raw: value.to_string(),
            });
            None
        }
    }
}

fn parse_count(field: &'static str, value: &str, issues: &mut Vec<ParseIssue>) -> Option<u64> {
    match first_token(value).parse::<u64>() {
        Ok(v) => Some(v),
        Err(_) => {
            issues.push(ParseIssue::InvalidNumber {
                field,
                raw: value.to_string(),
            });
            None
        }
    }
}

fn check_domains(metrics: &mut PartialMetrics, issues: &mut Vec<ParseIssue>) {
    let mut reject = |slot: &mut Option<f64>, field: &'static str, ok: fn(f64) -> bool| {
        if let Some(v) = *slot
            && !ok(v)
        {
            issues.push(ParseIssue::OutOfDomain { field, value: v });
            *slot = None;
        }
    };
    reject(&mut metrics.throughput_kbps, THROUGHPUT_LABEL, |v| v >= 0.0);
    reject(&mut metrics.delay_ms, DELAY_LABEL, |v| v >= 0.0);
    reject(&mut metrics.packet_loss_percent, LOSS_LABEL, |v| (0.0..=100.0).contains(&v));
}
