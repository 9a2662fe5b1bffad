use crate::aggregator::ResultTable;
use serde::Serialize;
use std::fmt;
use tracing::warn;
use wifi_lab_abstract::{CLIENT_COUNTS, Metric, Mobility, ScenarioKey, TrafficMix};

/// Client counts compared by the scalability table.
pub const LOW_LOAD_CLIENTS: u32 = 1;
pub const HIGH_LOAD_CLIENTS: u32 = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    MissingBaseline,
    MissingComparison,
    ZeroBaseline,
    NoData,
}

/// Result of a derived computation that may lack the data it needs.
///
/// Missing inputs and zero denominators are carried as `Undefined` rather
/// than coerced to zero or infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedValue {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl DerivedValue {
    pub fn defined(&self) -> Option<f64> {
        match self {
            DerivedValue::Defined(v) => Some(*v),
            DerivedValue::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, DerivedValue::Defined(_))
    }
}

impl fmt::Display for DerivedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedValue::Defined(v) => write!(f, "{v:.2}"),
            DerivedValue::Undefined(_) => f.write_str("n/a"),
        }
    }
}

/// Percentage change from `baseline` to `comparison`.
pub fn relative_change(baseline: Option<f64>, comparison: Option<f64>) -> DerivedValue {
    let Some(base) = baseline else {
        return DerivedValue::Undefined(UndefinedReason::MissingBaseline);
    };
    let Some(other) = comparison else {
        return DerivedValue::Undefined(UndefinedReason::MissingComparison);
    };
    if base == 0.0 {
        return DerivedValue::Undefined(UndefinedReason::ZeroBaseline);
    }
    DerivedValue::Defined((other - base) / base * 100.0)
}

/// (mobile − static) / static × 100 for one scenario pair.
pub fn mobility_impact(
    table: &ResultTable,
    metric: Metric,
    traffic: TrafficMix,
    clients: u32,
) -> DerivedValue {
    let Ok(stat) = ScenarioKey::new(clients, Mobility::Static, traffic) else {
        return DerivedValue::Undefined(UndefinedReason::NoData);
    };
    relative_change(
        table.value(&stat, metric),
        table.value(&stat.with_mobility(Mobility::Mobile), metric),
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRow {
    pub traffic: TrafficMix,
    pub clients: u32,
    pub impact_percent: DerivedValue,
}

pub fn mobility_impact_table(table: &ResultTable, metric: Metric) -> Vec<ImpactRow> {
    let mut rows = Vec::with_capacity(TrafficMix::ALL.len() * CLIENT_COUNTS.len());
    for traffic in TrafficMix::ALL {
        for clients in CLIENT_COUNTS {
            rows.push(ImpactRow {
                traffic,
                clients,
                impact_percent: mobility_impact(table, metric, traffic, clients),
            });
        }
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalabilityRow {
    /// Short label such as `CBR-S` or `MIXED-M`.
    pub label: String,
    pub traffic: TrafficMix,
    pub mobility: Mobility,
    pub low_load: f64,
    pub high_load: f64,
    /// False when the value was zero-filled for lack of data.
    pub low_measured: bool,
    pub high_measured: bool,
}

fn scalability_label(traffic: TrafficMix, mobility: Mobility) -> String {
    let initial = match mobility {
        Mobility::Static => 'S',
        Mobility::Mobile => 'M',
    };
    format!("{}-{initial}", traffic.as_str().to_uppercase())
}

fn zero_filled(table: &ResultTable, key: ScenarioKey, metric: Metric) -> (f64, bool) {
    match table.value(&key, metric) {
        Some(v) => (v, true),
        None => {
            warn!(scenario = %key, metric = metric.as_str(), "no data, zero-filling scalability cell");
            (0.0, false)
        }
    }
}

/// The six traffic × mobility pairs at 1 and 32 clients.
pub fn scalability_comparison(table: &ResultTable, metric: Metric) -> Vec<ScalabilityRow> {
    let mut rows = Vec::with_capacity(TrafficMix::ALL.len() * Mobility::ALL.len());
    for traffic in TrafficMix::ALL {
        for mobility in Mobility::ALL {
            let (Ok(low_key), Ok(high_key)) = (
                ScenarioKey::new(LOW_LOAD_CLIENTS, mobility, traffic),
                ScenarioKey::new(HIGH_LOAD_CLIENTS, mobility, traffic),
            ) else {
                continue;
            };
            let (low_load, low_measured) = zero_filled(table, low_key, metric);
            let (high_load, high_measured) = zero_filled(table, high_key, metric);
            rows.push(ScalabilityRow {
                label: scalability_label(traffic, mobility),
                traffic,
                mobility,
                low_load,
                high_load,
                low_measured,
                high_measured,
            });
        }
    }
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedThroughput {
    pub traffic: TrafficMix,
    pub clients: u32,
    /// Sum over both mobility modes, not a mean.
    pub total_kbps: DerivedValue,
    pub contributing: usize,
}

/// Throughput per (traffic, clients) summed across the mobility dimension.
///
/// A sum over only the present variants is still reported; `contributing`
/// says how many there were.
pub fn aggregated_throughput(table: &ResultTable) -> Vec<AggregatedThroughput> {
    let mut out = Vec::with_capacity(TrafficMix::ALL.len() * CLIENT_COUNTS.len());
    for traffic in TrafficMix::ALL {
        for clients in CLIENT_COUNTS {
            let values: Vec<f64> = Mobility::ALL
                .iter()
                .filter_map(|&mobility| ScenarioKey::new(clients, mobility, traffic).ok())
                .filter_map(|key| table.value(&key, Metric::Throughput))
                .collect();
            let total_kbps = if values.is_empty() {
                DerivedValue::Undefined(UndefinedReason::NoData)
            } else {
                DerivedValue::Defined(values.iter().sum())
            };
            out.push(AggregatedThroughput {
                traffic,
                clients,
                total_kbps,
                contributing: values.len(),
            });
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub clients: u32,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub mobility: Mobility,
    pub traffic: TrafficMix,
    pub points: Vec<SeriesPoint>,
}

/// Metric against client count for one mobility mode and traffic mix.
pub fn metric_series(
    table: &ResultTable,
    metric: Metric,
    mobility: Mobility,
    traffic: TrafficMix,
) -> MetricSeries {
    let points = CLIENT_COUNTS
        .iter()
        .map(|&clients| SeriesPoint {
            clients,
            value: ScenarioKey::new(clients, mobility, traffic)
                .ok()
                .and_then(|key| table.value(&key, metric)),
        })
        .collect();
    MetricSeries {
        mobility,
        traffic,
        points,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolRow {
    pub clients: u32,
    pub cbr: DerivedValue,
    pub tcp: DerivedValue,
}

fn mobility_mean(table: &ResultTable, metric: Metric, traffic: TrafficMix, clients: u32) -> DerivedValue {
    let values: Vec<f64> = Mobility::ALL
        .iter()
        .filter_map(|&mobility| ScenarioKey::new(clients, mobility, traffic).ok())
        .filter_map(|key| table.value(&key, metric))
        .collect();
    if values.is_empty() {
        DerivedValue::Undefined(UndefinedReason::NoData)
    } else {
        DerivedValue::Defined(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// cbr against tcp per client count, each averaged over mobility modes.
pub fn protocol_comparison(table: &ResultTable, metric: Metric) -> Vec<ProtocolRow> {
    CLIENT_COUNTS
        .iter()
        .map(|&clients| ProtocolRow {
            clients,
            cbr: mobility_mean(table, metric, TrafficMix::Cbr, clients),
            tcp: mobility_mean(table, metric, TrafficMix::Tcp, clients),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub metric: Metric,
    pub unit: &'static str,
    pub mobility_impact: Vec<ImpactRow>,
    pub scalability: Vec<ScalabilityRow>,
    pub protocol_comparison: Vec<ProtocolRow>,
    pub series: Vec<MetricSeries>,
}

/// Every derived statistic of one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedSummary {
    pub scenario_count: usize,
    pub metrics: Vec<MetricSummary>,
    pub aggregated_throughput: Vec<AggregatedThroughput>,
}

pub fn summarize(table: &ResultTable) -> DerivedSummary {
    let metrics = Metric::ALL
        .iter()
        .map(|&metric| MetricSummary {
            metric,
            unit: metric.unit(),
            mobility_impact: mobility_impact_table(table, metric),
            scalability: scalability_comparison(table, metric),
            protocol_comparison: protocol_comparison(table, metric),
            series: Mobility::ALL
                .iter()
                .flat_map(|&mobility| {
                    TrafficMix::ALL
                        .iter()
                        .map(move |&traffic| metric_series(table, metric, mobility, traffic))
                })
                .collect(),
        })
        .collect();

    DerivedSummary {
        scenario_count: table.len(),
        metrics,
        aggregated_throughput: aggregated_throughput(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wifi_lab_abstract::PartialMetrics;

    fn throughput(value: f64) -> PartialMetrics {
        PartialMetrics {
            throughput_kbps: Some(value),
            ..Default::default()
        }
    }

    fn key(clients: u32, mobility: Mobility, traffic: TrafficMix) -> ScenarioKey {
        ScenarioKey::new(clients, mobility, traffic).unwrap()
    }

    #[test]
    fn test_relative_change() {
        assert_eq!(relative_change(Some(100.0), Some(120.0)), DerivedValue::Defined(20.0));
        assert_eq!(relative_change(Some(50.0), Some(25.0)), DerivedValue::Defined(-50.0));
        assert_eq!(
            relative_change(Some(0.0), Some(5.0)),
            DerivedValue::Undefined(UndefinedReason::ZeroBaseline)
        );
        assert_eq!(
            relative_change(None, Some(5.0)),
            DerivedValue::Undefined(UndefinedReason::MissingBaseline)
        );
        assert_eq!(
            relative_change(Some(5.0), None),
            DerivedValue::Undefined(UndefinedReason::MissingComparison)
        );
    }

    #[test]
    fn test_mobility_impact_from_table() {
        let mut table = ResultTable::new();
        table.insert(key(4, Mobility::Static, TrafficMix::Tcp), throughput(100.0));
        table.insert(key(4, Mobility::Mobile, TrafficMix::Tcp), throughput(120.0));
        table.insert(key(8, Mobility::Static, TrafficMix::Tcp), throughput(0.0));
        table.insert(key(8, Mobility::Mobile, TrafficMix::Tcp), throughput(3.0));

        let impact = mobility_impact(&table, Metric::Throughput, TrafficMix::Tcp, 4);
        assert!((impact.defined().unwrap() - 20.0).abs() < 1e-12);

        let zero = mobility_impact(&table, Metric::Throughput, TrafficMix::Tcp, 8);
        assert!(!zero.is_defined());
        assert_eq!(zero.to_string(), "n/a");

        let absent = mobility_impact(&table, Metric::Delay, TrafficMix::Tcp, 4);
        assert_eq!(absent, DerivedValue::Undefined(UndefinedReason::MissingBaseline));

        let invalid = mobility_impact(&table, Metric::Throughput, TrafficMix::Tcp, 3);
        assert_eq!(invalid, DerivedValue::Undefined(UndefinedReason::NoData));
    }

    #[test]
    fn test_scalability_zero_fills_and_flags() {
        let mut table = ResultTable::new();
        table.insert(key(1, Mobility::Static, TrafficMix::Cbr), throughput(480.0));
        table.insert(key(32, Mobility::Static, TrafficMix::Cbr), throughput(0.0));

        let rows = scalability_comparison(&table, Metric::Throughput);
        let labels: Vec<_> = rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, ["CBR-S", "CBR-M", "TCP-S", "TCP-M", "MIXED-S", "MIXED-M"]);

        let cbr_static = &rows[0];
        assert_eq!((cbr_static.low_load, cbr_static.low_measured), (480.0, true));
        assert_eq!((cbr_static.high_load, cbr_static.high_measured), (0.0, true));

        let cbr_mobile = &rows[1];
        assert_eq!((cbr_mobile.low_load, cbr_mobile.low_measured), (0.0, false));
        assert!(!cbr_mobile.high_measured);
    }

    #[test]
    fn test_aggregated_throughput_sums_mobility() {
        let mut table = ResultTable::new();
        table.insert(key(2, Mobility::Static, TrafficMix::Mixed), throughput(300.0));
        table.insert(key(2, Mobility::Mobile, TrafficMix::Mixed), throughput(250.0));
        table.insert(key(4, Mobility::Mobile, TrafficMix::Mixed), throughput(200.0));

        let rows = aggregated_throughput(&table);
        let find = |clients| {
            rows.iter()
                .find(|r| r.traffic == TrafficMix::Mixed && r.clients == clients)
                .unwrap()
        };
        assert_eq!(find(2).total_kbps, DerivedValue::Defined(550.0));
        assert_eq!(find(2).contributing, 2);
        assert_eq!(find(4).total_kbps, DerivedValue::Defined(200.0));
        assert_eq!(find(4).contributing, 1);
        assert_eq!(find(8).total_kbps, DerivedValue::Undefined(UndefinedReason::NoData));
    }

    #[test]
    fn test_series_keeps_gaps() {
        let mut table = ResultTable::new();
        table.insert(key(16, Mobility::Mobile, TrafficMix::Cbr), throughput(210.0));
        let series = metric_series(&table, Metric::Throughput, Mobility::Mobile, TrafficMix::Cbr);
        assert_eq!(series.points.len(), CLIENT_COUNTS.len());
        assert_eq!(series.points[4].clients, 16);
        assert_eq!(series.points[4].value, Some(210.0));
        assert_eq!(series.points[0].value, None);
    }

    #[test]
    fn test_protocol_comparison_means_over_mobility() {
        let mut table = ResultTable::new();
        table.insert(key(1, Mobility::Static, TrafficMix::Cbr), throughput(500.0));
        table.insert(key(1, Mobility::Mobile, TrafficMix::Cbr), throughput(400.0));
        table.insert(key(1, Mobility::Mobile, TrafficMix::Tcp), throughput(300.0));

        let rows = protocol_comparison(&table, Metric::Throughput);
        assert_eq!(rows[0].cbr, DerivedValue::Defined(450.0));
        assert_eq!(rows[0].tcp, DerivedValue::Defined(300.0));
        assert!(!rows[1].cbr.is_defined());
    }

    #[test]
    fn test_summary_serializes_undefined_explicitly() {
        let summary = summarize(&ResultTable::new());
        assert_eq!(summary.metrics.len(), 3);
        assert_eq!(summary.metrics[0].series.len(), 6);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(
            json["metrics"][0]["mobility_impact"][0]["impact_percent"],
            serde_json::json!({ "undefined": "missing_baseline" })
        );
    }
}
