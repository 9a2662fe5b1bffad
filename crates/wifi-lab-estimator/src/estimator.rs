use rand::Rng;
use rand_distr::{Distribution, Normal};
use wifi_lab_abstract::{LinkRates, Mobility, ModelConfig, ScenarioKey};

/// Draw from N(mean, std_dev). A non-positive or non-finite deviation yields the mean.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    if !std_dev.is_finite() || std_dev <= 0.0 {
        return mean;
    }
    Normal::new(mean, std_dev)
        .map(|normal| normal.sample(rng))
        .unwrap_or(mean)
}

/// Analytical WLAN model producing throughput, delay and loss for a scenario.
///
/// Pure with respect to its inputs: the same key, configuration and RNG state
/// always give the same rates.
#[derive(Debug, Clone, Default)]
pub struct PerformanceEstimator {
    config: ModelConfig,
}

impl PerformanceEstimator {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// `1 + alpha * ln(max(1, clients))`
    pub fn contention_factor(&self, clients: u32) -> f64 {
        1.0 + self.config.contention_alpha * f64::from(clients.max(1)).ln()
    }

    /// Medium-access queueing term, inflated under mobility.
    pub fn queueing_delay_ms(&self, key: &ScenarioKey) -> f64 {
        let queue = self.config.queue_delay_coefficient * f64::from(key.clients() + 1).ln();
        match key.mobility() {
            Mobility::Static => queue,
            Mobility::Mobile => queue * self.config.mobile_queue_factor,
        }
    }

    fn loss_mean(&self, key: &ScenarioKey) -> f64 {
        let cfg = &self.config;
        let mobility_penalty = match key.mobility() {
            Mobility::Static => 0.0,
            Mobility::Mobile => cfg.loss_mobility_penalty,
        };
        cfg.loss_base_percent
            + cfg.loss_per_extra_client * f64::from(key.clients().saturating_sub(1))
            + mobility_penalty
    }

    /// Noise-free rates, with the same floors and clamps as [`Self::estimate`].
    pub fn nominal(&self, key: &ScenarioKey) -> LinkRates {
        let cfg = &self.config;
        let throughput = cfg.base_throughput(key.traffic()) / self.contention_factor(key.clients());
        let delay = cfg.physical_delay_mean_ms + self.queueing_delay_ms(key);
        LinkRates {
            throughput_kbps: throughput.max(cfg.throughput_floor),
            delay_ms: delay.max(cfg.delay_floor_ms),
            packet_loss_percent: self.loss_mean(key).clamp(0.0, 100.0),
        }
    }

    /// One noisy draw. Every output is floored or clamped into its domain
    /// regardless of the noise.
    pub fn estimate<R: Rng + ?Sized>(&self, key: &ScenarioKey, rng: &mut R) -> LinkRates {
        let cfg = &self.config;

        let throughput = cfg.base_throughput(key.traffic()) / self.contention_factor(key.clients());
        let throughput = throughput + gaussian(rng, 0.0, throughput * cfg.throughput_noise_ratio);
        let throughput = throughput.max(cfg.throughput_floor);

        let physical = gaussian(rng, cfg.physical_delay_mean_ms, cfg.physical_delay_std_ms);
        let total = physical + self.queueing_delay_ms(key);
        let delay = (total + gaussian(rng, 0.0, total * cfg.delay_noise_ratio)).max(cfg.delay_floor_ms);

        let loss = (self.loss_mean(key) + gaussian(rng, 0.0, cfg.loss_noise_std)).clamp(0.0, 100.0);

        LinkRates {
            throughput_kbps: throughput,
            delay_ms: delay,
            packet_loss_percent: loss,
        }
    }
}
