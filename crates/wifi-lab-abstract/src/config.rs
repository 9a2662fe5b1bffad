use crate::error::ValidationError;
use crate::scenario::{ScenarioGrid, TrafficMix};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Constants of the synthetic performance model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Single-client throughput per traffic mix, kbps.
    pub base_throughput_cbr: f64,
    pub base_throughput_tcp: f64,
    pub base_throughput_mixed: f64,
    /// Coefficient of the logarithmic contention factor.
    pub contention_alpha: f64,
    /// Gaussian noise on throughput, as a fraction of the value.
    pub throughput_noise_ratio: f64,
    pub throughput_floor: f64,

    pub physical_delay_mean_ms: f64,
    pub physical_delay_std_ms: f64,
    pub queue_delay_coefficient: f64,
    pub mobile_queue_factor: f64,
    pub delay_noise_ratio: f64,
    pub delay_floor_ms: f64,

    pub loss_base_percent: f64,
    pub loss_per_extra_client: f64,
    pub loss_mobility_penalty: f64,
    pub loss_noise_std: f64,

    /// Payload sizes in bytes; mixed uses the mean of both.
    pub packet_size_cbr_bytes: f64,
    pub packet_size_tcp_bytes: f64,
    /// Application start offset excluded from the accounting window, seconds.
    pub startup_offset_secs: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_throughput_cbr: 500.0,
            base_throughput_tcp: 480.0,
            base_throughput_mixed: 490.0,
            contention_alpha: 0.3,
            throughput_noise_ratio: 0.05,
            throughput_floor: 10.0,
            physical_delay_mean_ms: 2.0,
            physical_delay_std_ms: 0.5,
            queue_delay_coefficient: 2.0,
            mobile_queue_factor: 1.3,
            delay_noise_ratio: 0.1,
            delay_floor_ms: 1.0,
            loss_base_percent: 0.5,
            loss_per_extra_client: 0.2,
            loss_mobility_penalty: 2.0,
            loss_noise_std: 1.0,
            packet_size_cbr_bytes: 512.0,
            packet_size_tcp_bytes: 1500.0,
            startup_offset_secs: 1.0,
        }
    }
}

impl ModelConfig {
    pub fn base_throughput(&self, traffic: TrafficMix) -> f64 {
        match traffic {
            TrafficMix::Cbr => self.base_throughput_cbr,
            TrafficMix::Tcp => self.base_throughput_tcp,
            TrafficMix::Mixed => self.base_throughput_mixed,
        }
    }

    pub fn packet_size_bytes(&self, traffic: TrafficMix) -> f64 {
        match traffic {
            TrafficMix::Cbr => self.packet_size_cbr_bytes,
            TrafficMix::Tcp => self.packet_size_tcp_bytes,
            TrafficMix::Mixed => (self.packet_size_cbr_bytes + self.packet_size_tcp_bytes) / 2.0,
        }
    }
}

/// Partial model configuration read from a lab file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelConfigOverride {
    pub base_throughput_cbr: Option<f64>,
    pub base_throughput_tcp: Option<f64>,
    pub base_throughput_mixed: Option<f64>,
    pub contention_alpha: Option<f64>,
    pub throughput_noise_ratio: Option<f64>,
    pub throughput_floor: Option<f64>,
    pub physical_delay_mean_ms: Option<f64>,
    pub physical_delay_std_ms: Option<f64>,
    pub queue_delay_coefficient: Option<f64>,
    pub mobile_queue_factor: Option<f64>,
    pub delay_noise_ratio: Option<f64>,
    pub delay_floor_ms: Option<f64>,
    pub loss_base_percent: Option<f64>,
    pub loss_per_extra_client: Option<f64>,
    pub loss_mobility_penalty: Option<f64>,
    pub loss_noise_std: Option<f64>,
    pub packet_size_cbr_bytes: Option<f64>,
    pub packet_size_tcp_bytes: Option<f64>,
    pub startup_offset_secs: Option<f64>,
}

impl ModelConfigOverride {
    pub fn apply_to(&self, config: &mut ModelConfig) {
        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(v) = self.$field {
                        config.$field = v;
                    }
                )*
            };
        }
        apply!(
            base_throughput_cbr,
            base_throughput_tcp,
            base_throughput_mixed,
            contention_alpha,
            throughput_noise_ratio,
            throughput_floor,
            physical_delay_mean_ms,
            physical_delay_std_ms,
            queue_delay_coefficient,
            mobile_queue_factor,
            delay_noise_ratio,
            delay_floor_ms,
            loss_base_percent,
            loss_per_extra_client,
            loss_mobility_penalty,
            loss_noise_std,
            packet_size_cbr_bytes,
            packet_size_tcp_bytes,
            startup_offset_secs,
        );
    }

    pub fn resolve(&self) -> ModelConfig {
        let mut config = ModelConfig::default();
        self.apply_to(&mut config);
        config
    }
}

pub const DEFAULT_DURATION_SECS: f64 = 60.0;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub seed: u64,
    pub duration_secs: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            duration_secs: DEFAULT_DURATION_SECS,
        }
    }
}

impl RunConfig {
    pub fn validate(&self, model: &ModelConfig) -> Result<(), ValidationError> {
        if !self.duration_secs.is_finite() || self.duration_secs <= model.startup_offset_secs {
            return Err(ValidationError::Duration {
                duration: self.duration_secs,
                offset: model.startup_offset_secs,
            });
        }
        Ok(())
    }
}

/// Top-level lab file (TOML).
///
/// ```toml
/// results_dir = "results"
///
/// [run]
/// seed = 7
/// duration_secs = 60.0
///
/// [model]
/// contention_alpha = 0.35
///
/// [grid]
/// clients = [1, 8, 32]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub results_dir: Option<PathBuf>,
    pub run: RunConfig,
    pub model: ModelConfigOverride,
    pub grid: ScenarioGrid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_packet_size_is_mean() {
        let config = ModelConfig::default();
        assert_eq!(config.packet_size_bytes(TrafficMix::Mixed), 1006.0);
    }

    #[test]
    fn test_override_only_touches_given_fields() {
        let lab: LabConfig = toml::from_str(
            r#"
            [model]
            contention_alpha = 0.5
            base_throughput_tcp = 400.0

            [run]
            seed = 9
            "#,
        )
        .unwrap();
        let model = lab.model.resolve();
        assert_eq!(model.contention_alpha, 0.5);
        assert_eq!(model.base_throughput_tcp, 400.0);
        assert_eq!(model.base_throughput_cbr, 500.0);
        assert_eq!(lab.run.seed, 9);
        assert_eq!(lab.run.duration_secs, DEFAULT_DURATION_SECS);
        assert_eq!(lab.grid, ScenarioGrid::default());
        assert!(lab.results_dir.is_none());
    }

    #[test]
    fn test_duration_must_exceed_startup_offset() {
        let model = ModelConfig::default();
        let ok = RunConfig::default();
        assert!(ok.validate(&model).is_ok());

        for duration in [1.0, 0.5, -3.0, f64::NAN, f64::INFINITY] {
            let run = RunConfig {
                duration_secs: duration,
                ..Default::default()
            };
            assert!(run.validate(&model).is_err(), "{duration}");
        }
    }
}
