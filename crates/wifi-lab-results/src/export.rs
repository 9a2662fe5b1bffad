use crate::aggregator::ResultTable;
use crate::stats::{DerivedSummary, DerivedValue};
use anyhow::{Context, Result};
use std::fmt::Display;
use std::fs;
use std::path::Path;
use wifi_lab_abstract::Metric;

pub const CSV_HEADER: &str = "clients,mobility,traffic,throughput_kbps,delay_ms,packet_loss_percent,packets_sent,packets_received,packets_lost";

fn cell<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per stored scenario; absent fields become empty cells.
pub fn render_csv(table: &ResultTable) -> String {
    let mut out = String::new();
    out.push_str(CSV_HEADER);
    out.push('\n');
    for (key, m) in table.iter() {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            key.clients(),
            key.mobility(),
            key.traffic(),
            cell(m.throughput_kbps),
            cell(m.delay_ms),
            cell(m.packet_loss_percent),
            cell(m.packets_sent),
            cell(m.packets_received),
            cell(m.packets_lost),
        ));
    }
    out
}

fn write_text(path: &Path, text: &str, what: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory for {}", path.display()))?;
    }
    fs::write(path, text).with_context(|| format!("failed to write {what} {}", path.display()))
}

pub fn write_csv(table: &ResultTable, path: &Path) -> Result<()> {
    write_text(path, &render_csv(table), "csv table")
}

pub fn write_json(summary: &DerivedSummary, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("failed to serialise summary")?;
    write_text(path, &json, "summary")
}

pub fn write_markdown(summary: &DerivedSummary, path: &Path) -> Result<()> {
    write_text(path, &render_markdown(summary), "markdown report")
}

fn percent(value: &DerivedValue) -> String {
    match value {
        DerivedValue::Defined(v) => format!("{v:+.2}%"),
        DerivedValue::Undefined(_) => "n/a".to_string(),
    }
}

pub fn render_markdown(summary: &DerivedSummary) -> String {
    let mut out = String::new();
    out.push_str("# WLAN scenario performance summary\n\n");
    out.push_str(&format!("- Scenarios with stored results: {}\n", summary.scenario_count));

    for section in &summary.metrics {
        let title = match section.metric {
            Metric::Throughput => "Throughput",
            Metric::Delay => "Delay",
            Metric::PacketLoss => "Packet loss",
        };
        out.push_str(&format!("\n## {title} ({})\n\n", section.unit));

        out.push_str("### Mobility impact (mobile vs static)\n\n");
        out.push_str("| Traffic | Clients | Impact |\n|---|---|---|\n");
        for row in &section.mobility_impact {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.traffic,
                row.clients,
                percent(&row.impact_percent)
            ));
        }

        out.push_str("\n### Scalability (1 vs 32 clients)\n\n");
        out.push_str("| Pair | 1 client | 32 clients |\n|---|---|---|\n");
        for row in &section.scalability {
            let mark = |measured: bool| if measured { "" } else { " (no data)" };
            out.push_str(&format!(
                "| {} | {:.2}{} | {:.2}{} |\n",
                row.label,
                row.low_load,
                mark(row.low_measured),
                row.high_load,
                mark(row.high_measured)
            ));
        }

        out.push_str("\n### CBR vs TCP (mean over mobility)\n\n");
        out.push_str("| Clients | CBR | TCP |\n|---|---|---|\n");
        for row in &section.protocol_comparison {
            out.push_str(&format!("| {} | {} | {} |\n", row.clients, row.cbr, row.tcp));
        }
    }

    out.push_str("\n## Aggregated throughput (sum over mobility, kbps)\n\n");
    out.push_str("| Traffic | Clients | Total | Variants |\n|---|---|---|---|\n");
    for row in &summary.aggregated_throughput {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.traffic, row.clients, row.total_kbps, row.contributing
        ));
    }

    out
}
