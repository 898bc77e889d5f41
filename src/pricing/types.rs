use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{require, PricingError, Result};

/// Option type: call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Payoff of immediate exercise at the given underlying price.
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OptionType::Call => "call",
            OptionType::Put => "put",
        })
    }
}

impl FromStr for OptionType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            other => Err(PricingError::InvalidParameter(format!(
                "unknown option type: {other}"
            ))),
        }
    }
}

/// When the holder may exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStyle {
    /// Exercisable only at maturity.
    European,
    /// Exercisable at any time up to maturity.
    American,
}

impl fmt::Display for ExerciseStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExerciseStyle::European => "european",
            ExerciseStyle::American => "american",
        })
    }
}

impl FromStr for ExerciseStyle {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "european" | "eu" => Ok(ExerciseStyle::European),
            "american" | "am" => Ok(ExerciseStyle::American),
            other => Err(PricingError::InvalidParameter(format!(
                "unknown exercise style: {other}"
            ))),
        }
    }
}

/// A vanilla option contract.
///
/// Fields are private so that every instance has passed [`OptionContract::new`];
/// use [`OptionContract::with_style`] to derive a restyled copy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptionContract {
    spot: f64,
    strike: f64,
    maturity: f64,
    option_type: OptionType,
    style: ExerciseStyle,
}

impl OptionContract {
    /// Build a validated contract.
    ///
    /// # Errors
    ///
    /// [`PricingError::InvalidParameter`] if `strike <= 0`, `spot < 0`,
    /// `maturity < 0` or any value is not finite.
    pub fn new(
        spot: f64,
        strike: f64,
        maturity: f64,
        option_type: OptionType,
        style: ExerciseStyle,
    ) -> Result<Self> {
        require!(
            spot.is_finite() && spot >= 0.0,
            "spot (S={spot}) must be >= 0 and finite"
        );
        require!(
            strike.is_finite() && strike > 0.0,
            "strike (K={strike}) must be > 0 and finite"
        );
        require!(
            maturity.is_finite() && maturity >= 0.0,
            "maturity (T={maturity}) must be >= 0 and finite"
        );
        Ok(Self {
            spot,
            strike,
            maturity,
            option_type,
            style,
        })
    }

    /// Current underlying price S₀.
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Strike price K.
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// Time to maturity T in years.
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    pub fn style(&self) -> ExerciseStyle {
        self.style
    }

    /// Same contract with a different exercise style.
    pub fn with_style(self, style: ExerciseStyle) -> Self {
        Self { style, ..self }
    }

    /// Same contract on a different underlying price.
    pub fn with_spot(self, spot: f64) -> Result<Self> {
        Self::new(spot, self.strike, self.maturity, self.option_type, self.style)
    }

    /// Payoff of exercising now.
    pub fn intrinsic_value(&self) -> f64 {
        self.option_type.intrinsic(self.spot, self.strike)
    }
}

/// Market state: continuously-compounded rate, volatility and dividend yield.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarketEnvironment {
    risk_free_rate: f64,
    volatility: f64,
    dividend_yield: f64,
}

impl MarketEnvironment {
    /// Build a validated market environment.
    ///
    /// # Errors
    ///
    /// [`PricingError::InvalidParameter`] if `volatility < 0`,
    /// `dividend_yield < 0` or any value is not finite.
    pub fn new(risk_free_rate: f64, volatility: f64, dividend_yield: f64) -> Result<Self> {
        require!(
            risk_free_rate.is_finite(),
            "risk-free rate (r={risk_free_rate}) must be finite"
        );
        require!(
            volatility.is_finite() && volatility >= 0.0,
            "volatility (sigma={volatility}) must be >= 0 and finite"
        );
        require!(
            dividend_yield.is_finite() && dividend_yield >= 0.0,
            "dividend yield (q={dividend_yield}) must be >= 0 and finite"
        );
        Ok(Self {
            risk_free_rate,
            volatility,
            dividend_yield,
        })
    }

    /// Market without dividends.
    pub fn without_dividends(risk_free_rate: f64, volatility: f64) -> Result<Self> {
        Self::new(risk_free_rate, volatility, 0.0)
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    pub fn dividend_yield(&self) -> f64 {
        self.dividend_yield
    }

    /// Same market with a different volatility.
    pub fn with_volatility(self, volatility: f64) -> Result<Self> {
        Self::new(self.risk_free_rate, volatility, self.dividend_yield)
    }
}

/// Price sensitivities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Greeks {
    /// ∂price/∂spot
    pub delta: f64,
    /// ∂price/∂volatility (per unit of volatility, not per percentage point)
    pub vega: f64,
}

impl Greeks {
    /// Name → value view, in alphabetical order.
    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([("delta", self.delta), ("vega", self.vega)])
    }
}

/// Caller-level adjustments made while serving a request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PricingWarning {
    /// An American request was repriced as European for the closed-form engine.
    DowngradedToEuropean,
    /// An American request was routed to the lattice engine.
    RoutedToLattice { steps: usize },
    /// Greeks were estimated by bump-and-reprice.
    FiniteDifferenceGreeks,
    /// The lattice reported a numeric anomaly.
    NumericAnomaly { detail: String },
}

impl fmt::Display for PricingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingWarning::DowngradedToEuropean => f.write_str(
                "closed-form engine does not support American options; priced as European",
            ),
            PricingWarning::RoutedToLattice { steps } => write!(
                f,
                "American option routed to the lattice engine ({steps} steps)"
            ),
            PricingWarning::FiniteDifferenceGreeks => {
                f.write_str("Greeks estimated by finite differences")
            }
            PricingWarning::NumericAnomaly { detail } => write!(f, "numeric anomaly: {detail}"),
        }
    }
}

/// Everything a result presenter needs for one priced request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingReport {
    /// Name of the engine that produced the price.
    pub engine: &'static str,
    /// The contract actually priced (after any caller-level restyling).
    pub option: OptionContract,
    pub market: MarketEnvironment,
    pub price: f64,
    /// `None` means no sensitivities are available, not a failure.
    pub greeks: Option<Greeks>,
    pub warnings: Vec<PricingWarning>,
}
