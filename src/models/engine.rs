//! Engine selection by name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{PricingError, Result};
use crate::models::bs::BlackScholesEngine;
use crate::models::lattice::{BinomialEngine, LatticeOutcome};
use crate::models::traits::PricingEngine;
use crate::pricing::types::{Greeks, MarketEnvironment, OptionContract};

/// Which pricing method to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    #[default]
    #[serde(alias = "bs", alias = "black_scholes")]
    ClosedForm,
    #[serde(alias = "binomial")]
    Lattice,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EngineKind::ClosedForm => BlackScholesEngine::NAME,
            EngineKind::Lattice => BinomialEngine::NAME,
        })
    }
}

impl FromStr for EngineKind {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "closed_form" | "closed-form" | "bs" | "black_scholes" => Ok(EngineKind::ClosedForm),
            "lattice" | "binomial" => Ok(EngineKind::Lattice),
            other => Err(PricingError::InvalidConfig(format!(
                "unknown engine: {other} (expected closed_form or lattice)"
            ))),
        }
    }
}

/// Tagged union over the available engines.
///
/// A further method (e.g. Monte Carlo) would be another variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    ClosedForm(BlackScholesEngine),
    Lattice(BinomialEngine),
}

impl Engine {
    pub fn closed_form() -> Self {
        Engine::ClosedForm(BlackScholesEngine::new())
    }

    pub fn lattice(steps: usize) -> Result<Self> {
        BinomialEngine::new(steps).map(Engine::Lattice)
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            Engine::ClosedForm(_) => EngineKind::ClosedForm,
            Engine::Lattice(_) => EngineKind::Lattice,
        }
    }

    fn as_dyn(&self) -> &dyn PricingEngine {
        match self {
            Engine::ClosedForm(engine) => engine,
            Engine::Lattice(engine) => engine,
        }
    }

    /// Price, keeping lattice diagnostics when the lattice is used.
    pub fn price_with_diagnostics(
        &self,
        option: &OptionContract,
        market: &MarketEnvironment,
    ) -> Result<LatticeOutcome> {
        match self {
            Engine::Lattice(engine) => engine.price_with_diagnostics(option, market),
            Engine::ClosedForm(engine) => Ok(LatticeOutcome {
                price: engine.price(option, market)?,
                anomaly: None,
            }),
        }
    }
}

impl From<BlackScholesEngine> for Engine {
    fn from(engine: BlackScholesEngine) -> Self {
        Engine::ClosedForm(engine)
    }
}

impl From<BinomialEngine> for Engine {
    fn from(engine: BinomialEngine) -> Self {
        Engine::Lattice(engine)
    }
}

impl PricingEngine for Engine {
    fn name(&self) -> &'static str {
        self.as_dyn().name()
    }

    fn price(&self, option: &OptionContract, market: &MarketEnvironment) -> Result<f64> {
        self.as_dyn().price(option, market)
    }

    fn greeks(&self, option: &OptionContract, market: &MarketEnvironment) -> Option<Greeks> {
        self.as_dyn().greeks(option, market)
    }
}
