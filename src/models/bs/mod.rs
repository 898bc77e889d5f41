//! Closed-form Black-Scholes-Merton engine for European options.
//!
//! With continuous dividend yield `q`:
//!
//! ```text
//! d1 = (ln(S/K) + (r - q + σ²/2)·T) / (σ·√T)
//! d2 = d1 - σ·√T
//! C  = S·e^{-qT}·N(d1) - K·e^{-rT}·N(d2)
//! P  = K·e^{-rT}·N(-d2) - S·e^{-qT}·N(-d1)
//! ```
//!
//! American options are rejected rather than silently priced as European.

use tracing::{debug, warn};

use crate::error::{NumericAnomaly, PricingError, Result};
use crate::models::traits::PricingEngine;
use crate::models::utils::{is_expired, normal_cdf, normal_pdf};
use crate::pricing::types::{ExerciseStyle, Greeks, MarketEnvironment, OptionContract, OptionType};

/// Analytic European pricer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlackScholesEngine;

impl BlackScholesEngine {
    pub const NAME: &'static str = "closed_form";

    pub fn new() -> Self {
        Self
    }

    fn ensure_european(option: &OptionContract) -> Result<()> {
        match option.style() {
            ExerciseStyle::European => Ok(()),
            style => Err(PricingError::UnsupportedConfiguration {
                engine: Self::NAME,
                style,
            }),
        }
    }
}

/// `d1` and `d2`; both are `0` for an expired contract.
///
/// Otherwise, when `σ·√T` is zero the ratio is resolved to its limit: `±∞` according to
/// the sign of the log-forward moneyness, or `0` exactly at the forward.
#[allow(non_snake_case)]
pub fn d1_d2(option: &OptionContract, market: &MarketEnvironment) -> (f64, f64) {
    let S = option.spot();
    let K = option.strike();
    let T = option.maturity();
    let r = market.risk_free_rate();
    let q = market.dividend_yield();
    let sigma = market.volatility();

    if is_expired(option) {
        return (0.0, 0.0);
    }

    let vol_sqrt_t = sigma * T.sqrt();
    let numerator = (S / K).ln() + (r - q + 0.5 * sigma * sigma) * T;

    if vol_sqrt_t == 0.0 {
        warn!(anomaly = %NumericAnomaly::DegenerateDiffusion, spot = S, strike = K, maturity = T);
        let limit = if numerator > 0.0 {
            f64::INFINITY
        } else if numerator < 0.0 {
            f64::NEG_INFINITY
        } else {
            0.0
        };
        return (limit, limit);
    }

    let d1 = numerator / vol_sqrt_t;
    (d1, d1 - vol_sqrt_t)
}

impl PricingEngine for BlackScholesEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    #[allow(non_snake_case)]
    fn price(&self, option: &OptionContract, market: &MarketEnvironment) -> Result<f64> {
        Self::ensure_european(option)?;

        if is_expired(option) {
            return Ok(option.intrinsic_value());
        }

        let S = option.spot();
        let K = option.strike();
        let T = option.maturity();
        let (d1, d2) = d1_d2(option, market);
        let spot_df = S * (-market.dividend_yield() * T).exp();
        let strike_df = K * (-market.risk_free_rate() * T).exp();

        let price = match option.option_type() {
            OptionType::Call => spot_df * normal_cdf(d1) - strike_df * normal_cdf(d2),
            OptionType::Put => strike_df * normal_cdf(-d2) - spot_df * normal_cdf(-d1),
        };
        debug!(engine = Self::NAME, d1, d2, price, "closed-form price");
        Ok(price)
    }

    /// Delta and vega. `None` for American contracts.
    #[allow(non_snake_case)]
    fn greeks(&self, option: &OptionContract, market: &MarketEnvironment) -> Option<Greeks> {
        Self::ensure_european(option).ok()?;

        if is_expired(option) {
            return Some(Greeks {
                delta: 0.0,
                vega: 0.0,
            });
        }

        let T = option.maturity();
        let (d1, _) = d1_d2(option, market);
        let carry = (-market.dividend_yield() * T).exp();

        let delta = match option.option_type() {
            OptionType::Call => carry * normal_cdf(d1),
            OptionType::Put => -carry * normal_cdf(-d1),
        };
        // φ(±∞) is 0, so a degenerate diffusion gives zero vega
        let vega = option.spot() * carry * normal_pdf(d1) * T.sqrt();

        Some(Greeks { delta, vega })
    }
}
