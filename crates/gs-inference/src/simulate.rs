//! Synthetic dataset generation for demos and recovery tests.
//!
//! Two generators, both deterministic per seed:
//!
//! - a customer-level pre/post dataset with a known pre/post slope and
//!   a known multiplicative treatment effect, for exercising the CUPED
//!   adjustment;
//! - a geo-level daily panel with a seasonal base signal and a
//!   multiplicative treatment effect on one geo after a boundary day,
//!   ready to feed straight into the synthetic control estimator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal, Normal};

use gs_core::{Error, Result};

use crate::synth::LongTable;

/// Configuration for [`simulate_customer_dataset`].
#[derive(Debug, Clone)]
pub struct CustomerDatasetConfig {
    /// Number of customers.
    pub n_customers: usize,
    /// Number of geos customers are spread across.
    pub n_geos: usize,
    /// Probability of assignment to treatment.
    pub treatment_ratio: f64,
    /// Pre/post outcome slope (the CUPED theta).
    pub theta: f64,
    /// Multiplicative treatment effect (0.10 = +10%).
    pub treatment_effect: f64,
}

impl Default for CustomerDatasetConfig {
    fn default() -> Self {
        Self {
            n_customers: 10_000,
            n_geos: 5,
            treatment_ratio: 0.5,
            theta: 0.7,
            treatment_effect: 0.10,
        }
    }
}

/// Customer-level pre/post dataset.
#[derive(Debug, Clone)]
pub struct CustomerDataset {
    /// Customer identifiers (`cust_0000001`, ...).
    pub customer_id: Vec<String>,
    /// Treatment assignment: 1 = treated, 0 = control.
    pub treatment: Vec<u8>,
    /// Pre-experiment spend.
    pub pre_spend: Vec<f64>,
    /// Post-experiment spend.
    pub post_spend: Vec<f64>,
    /// Geo labels (`geo_1`, ...).
    pub geo: Vec<String>,
    /// First binary experimental factor.
    pub factor_a: Vec<u8>,
    /// Second binary experimental factor.
    pub factor_b: Vec<u8>,
}

/// Simulate a customer-level pre/post dataset.
///
/// Pre spend is log-normal; post spend is `theta * pre` plus log-normal
/// noise, scaled up by the treatment effect for treated customers.
pub fn simulate_customer_dataset(
    config: &CustomerDatasetConfig,
    seed: u64,
) -> Result<CustomerDataset> {
    if config.n_customers == 0 {
        return Err(Error::Validation("n_customers must be >= 1".into()));
    }
    if config.n_geos == 0 {
        return Err(Error::Validation("n_geos must be >= 1".into()));
    }
    if !(0.0..=1.0).contains(&config.treatment_ratio) {
        return Err(Error::Validation(format!(
            "treatment_ratio must be in [0, 1], got {}",
            config.treatment_ratio
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let spend_scale = 100.0;
    let pre_dist = LogNormal::new(1.2, 0.8)
        .map_err(|e| Error::Validation(format!("bad pre-spend distribution: {}", e)))?;
    let noise_dist = LogNormal::new(0.0, 0.6)
        .map_err(|e| Error::Validation(format!("bad noise distribution: {}", e)))?;

    let n = config.n_customers;
    let mut out = CustomerDataset {
        customer_id: Vec::with_capacity(n),
        treatment: Vec::with_capacity(n),
        pre_spend: Vec::with_capacity(n),
        post_spend: Vec::with_capacity(n),
        geo: Vec::with_capacity(n),
        factor_a: Vec::with_capacity(n),
        factor_b: Vec::with_capacity(n),
    };

    for i in 0..n {
        let treated = rng.gen_bool(config.treatment_ratio);
        let pre = pre_dist.sample(&mut rng) * spend_scale;
        let mut post = config.theta * pre + noise_dist.sample(&mut rng) * spend_scale;
        if treated {
            post *= 1.0 + config.treatment_effect;
        }
        out.customer_id.push(format!("cust_{:07}", i));
        out.treatment.push(treated as u8);
        out.pre_spend.push(pre);
        out.post_spend.push(post);
        out.geo.push(format!("geo_{}", rng.gen_range(1..=config.n_geos)));
        out.factor_a.push(rng.gen_bool(0.5) as u8);
        out.factor_b.push(rng.gen_bool(0.5) as u8);
    }
    Ok(out)
}

/// Configuration for [`simulate_geo_panel`].
#[derive(Debug, Clone)]
pub struct GeoPanelConfig {
    /// Geo labels; the first is conventionally the treated one.
    pub geos: Vec<String>,
    /// Label of the treated geo.
    pub treated_geo: String,
    /// Number of daily time points (time values 0, 1, ..., n_days - 1).
    pub n_days: usize,
    /// Boundary day: the effect applies to days strictly after this.
    pub boundary: f64,
    /// Multiplicative treatment effect (0.20 = +20%).
    pub treatment_effect: f64,
    /// Baseline outcome level.
    pub base_level: f64,
    /// Amplitude of the shared seasonal component.
    pub seasonal_amplitude: f64,
    /// Standard deviation of the additive daily noise.
    pub noise_sd: f64,
}

impl Default for GeoPanelConfig {
    fn default() -> Self {
        Self {
            geos: vec!["geo_1".into(), "geo_2".into(), "geo_3".into(), "geo_4".into()],
            treated_geo: "geo_1".into(),
            n_days: 90,
            boundary: 44.0,
            treatment_effect: 0.20,
            base_level: 100.0,
            seasonal_amplitude: 10.0,
            noise_sd: 1.0,
        }
    }
}

/// Simulate a geo-level daily panel as a long table with columns
/// `date`, `geo`, `spend`.
///
/// Every geo shares a seasonal signal around its own base level (geos
/// get slightly different levels so controls are informative but not
/// identical); the treated geo's outcomes are scaled by
/// `1 + treatment_effect` strictly after the boundary day.
pub fn simulate_geo_panel(config: &GeoPanelConfig, seed: u64) -> Result<LongTable> {
    if config.geos.len() < 2 {
        return Err(Error::Validation("need at least 2 geos (one treated, one control)".into()));
    }
    if config.n_days == 0 {
        return Err(Error::Validation("n_days must be >= 1".into()));
    }
    if !config.geos.iter().any(|g| *g == config.treated_geo) {
        return Err(Error::Validation(format!(
            "treated geo '{}' is not in the geo list",
            config.treated_geo
        )));
    }
    if !config.noise_sd.is_finite() || config.noise_sd < 0.0 {
        return Err(Error::Validation(format!(
            "noise_sd must be finite and >= 0, got {}",
            config.noise_sd
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, config.noise_sd.max(f64::MIN_POSITIVE))
        .map_err(|e| Error::Validation(format!("bad noise distribution: {}", e)))?;

    let n = config.n_days * config.geos.len();
    let mut time = Vec::with_capacity(n);
    let mut geo = Vec::with_capacity(n);
    let mut spend = Vec::with_capacity(n);

    for d in 0..config.n_days {
        let t = d as f64;
        let seasonal = config.seasonal_amplitude * (t / 30.0).sin();
        for (g_idx, g) in config.geos.iter().enumerate() {
            // Spread geo levels over roughly +/-20% of base.
            let level = config.base_level * (0.8 + 0.1 * g_idx as f64);
            let mut v = level + seasonal + if config.noise_sd > 0.0 { noise.sample(&mut rng) } else { 0.0 };
            if *g == config.treated_geo && t > config.boundary {
                v *= 1.0 + config.treatment_effect;
            }
            time.push(t);
            geo.push(g.clone());
            spend.push(v);
        }
    }

    let mut table = LongTable::new();
    table.push_float("date", time)?;
    table.push_label("geo", geo)?;
    table.push_float("spend", spend)?;
    Ok(table)
}
