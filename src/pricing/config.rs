use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{PricingError, Result};
use crate::models::engine::{Engine, EngineKind};
use crate::models::lattice::{BinomialEngine, DEFAULT_STEPS};

/// What to do when an American contract is sent to the closed-form engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmericanFallback {
    /// Warn and price the contract as European
    #[default]
    Downgrade,
    /// Warn and price with the lattice engine instead
    Lattice,
    /// Pass the engine's `UnsupportedConfiguration` error back to the caller
    Reject,
}

/// Where Greeks come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GreeksMode {
    /// Only what the engine derives itself
    #[default]
    Analytic,
    /// Fall back to bump-and-reprice when the engine has none
    FiniteDifference,
    /// Skip Greeks entirely
    Off,
}

/// Bump sizes for finite-difference Greeks
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BumpConfig {
    /// Relative spot bump (0.01 = 1% of spot)
    #[serde(default = "default_spot_rel")]
    pub spot_rel: f64,
    /// Absolute volatility bump (0.01 = one vol point)
    #[serde(default = "default_vol_abs")]
    pub vol_abs: f64,
}

impl Default for BumpConfig {
    fn default() -> Self {
        Self {
            spot_rel: default_spot_rel(),
            vol_abs: default_vol_abs(),
        }
    }
}

/// Main pricer configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PricerConfig {
    #[serde(default)]
    pub engine: EngineKind,

    /// Depth of the binomial tree
    #[serde(default = "default_lattice_steps")]
    pub lattice_steps: usize,

    #[serde(default)]
    pub american_fallback: AmericanFallback,

    /// Wall-clock budget for one lattice valuation (None = unbounded)
    #[serde(default)]
    pub deadline_ms: Option<u64>,

    #[serde(default)]
    pub greeks: GreeksMode,

    #[serde(default)]
    pub bumps: BumpConfig,

    /// Price batches on the rayon thread pool
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for PricerConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            lattice_steps: default_lattice_steps(),
            american_fallback: AmericanFallback::default(),
            deadline_ms: None,
            greeks: GreeksMode::default(),
            bumps: BumpConfig::default(),
            parallel: default_parallel(),
        }
    }
}

impl PricerConfig {
    /// Production settings: deep lattice, bounded run time
    pub fn production() -> Self {
        Self {
            lattice_steps: 500,
            deadline_ms: Some(5_000),
            greeks: GreeksMode::FiniteDifference,
            ..Self::default()
        }
    }

    /// Fast settings for development and testing
    pub fn fast() -> Self {
        Self {
            lattice_steps: DEFAULT_STEPS,
            ..Self::default()
        }
    }

    /// High-precision settings for research and model comparison
    pub fn research() -> Self {
        Self {
            lattice_steps: 2_000,
            greeks: GreeksMode::FiniteDifference,
            bumps: BumpConfig {
                spot_rel: 1e-3,
                vol_abs: 1e-3,
            },
            ..Self::default()
        }
    }

    /// Minimal settings for quick validation
    pub fn minimal() -> Self {
        Self {
            lattice_steps: 25,
            parallel: false,
            ..Self::default()
        }
    }

    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("failed to parse pricer config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.lattice_steps == 0 {
            return Err(PricingError::InvalidConfig(
                "lattice_steps must be >= 1".to_string(),
            ));
        }
        if self.deadline_ms == Some(0) {
            return Err(PricingError::InvalidConfig(
                "deadline_ms must be >= 1; omit it to disable the deadline".to_string(),
            ));
        }
        if !(self.bumps.spot_rel.is_finite() && self.bumps.spot_rel > 0.0) {
            return Err(PricingError::InvalidConfig(format!(
                "bumps.spot_rel must be > 0, got {}",
                self.bumps.spot_rel
            )));
        }
        if !(self.bumps.vol_abs.is_finite() && self.bumps.vol_abs > 0.0) {
            return Err(PricingError::InvalidConfig(format!(
                "bumps.vol_abs must be > 0, got {}",
                self.bumps.vol_abs
            )));
        }
        Ok(())
    }

    /// Lattice engine with this config's depth and deadline.
    pub fn lattice_engine(&self) -> Result<BinomialEngine> {
        let engine = BinomialEngine::new(self.lattice_steps)?;
        Ok(match self.deadline_ms {
            Some(ms) => engine.with_deadline(Duration::from_millis(ms)),
            None => engine,
        })
    }

    /// Engine of the given kind, configured from this config.
    pub fn build_engine(&self, kind: EngineKind) -> Result<Engine> {
        Ok(match kind {
            EngineKind::ClosedForm => Engine::closed_form(),
            EngineKind::Lattice => Engine::Lattice(self.lattice_engine()?),
        })
    }
}

fn default_lattice_steps() -> usize {
    DEFAULT_STEPS
}

fn default_spot_rel() -> f64 {
    0.01
}

fn default_vol_abs() -> f64 {
    0.01
}

fn default_parallel() -> bool {
    true
}
