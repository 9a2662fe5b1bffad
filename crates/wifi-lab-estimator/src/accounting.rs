use wifi_lab_abstract::{LinkRates, ModelConfig, PacketCounts, TrafficMix};

/// Packet size of a traffic mix, in bits.
pub fn packet_size_bits(config: &ModelConfig, traffic: TrafficMix) -> f64 {
    config.packet_size_bytes(traffic) * 8.0
}

/// Seconds of the run during which traffic flows.
pub fn effective_duration_secs(config: &ModelConfig, duration_secs: f64) -> f64 {
    (duration_secs - config.startup_offset_secs).max(0.0)
}

/// Derives integer packet counts consistent with the estimated rates.
///
/// Both `sent` and `lost` are truncated toward zero, so that
/// `sent = received + lost` holds exactly.
pub fn account_packets(
    config: &ModelConfig,
    traffic: TrafficMix,
    rates: &LinkRates,
    duration_secs: f64,
) -> PacketCounts {
    let bits_per_sec = rates.throughput_kbps * 1000.0;
    let size_bits = packet_size_bits(config, traffic);
    let sent = if size_bits > 0.0 {
        truncate_count(bits_per_sec * effective_duration_secs(config, duration_secs) / size_bits)
    } else {
        0
    };
    let loss_ratio = rates.packet_loss_percent.clamp(0.0, 100.0) / 100.0;
    let lost = truncate_count(sent as f64 * loss_ratio);
    PacketCounts::from_sent_and_lost(sent, lost)
}

// Negative and NaN inputs collapse to zero.
fn truncate_count(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value.floor() as u64
    }
}
