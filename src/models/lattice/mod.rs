//! Cox-Ross-Rubinstein binomial lattice.
//!
//! A recombining tree of `N` steps priced by backward induction over a single
//! buffer of `N + 1` node values, so memory stays `O(N)` while time is
//! `O(N²)`. American exercise compares continuation against intrinsic value
//! at every interior node.
//!
//! The risk-neutral probability `p = (e^{(r-q)Δt} - d) / (u - d)` is used as
//! computed. When `σ` is small relative to `r - q` it leaves `[0, 1]`; the
//! result is then still a finite number but not a risk-neutral expectation,
//! and the condition is reported as [`NumericAnomaly::ProbabilityOutOfRange`].

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::{NumericAnomaly, PricingError, Result};
use crate::models::traits::PricingEngine;
use crate::models::utils::is_expired;
use crate::pricing::types::{ExerciseStyle, MarketEnvironment, OptionContract};

/// Number of steps used when none is configured.
pub const DEFAULT_STEPS: usize = 100;

/// Binomial tree engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinomialEngine {
    steps: usize,
    deadline: Option<Duration>,
}

/// Lattice price together with any numeric anomaly met on the way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatticeOutcome {
    pub price: f64,
    pub anomaly: Option<NumericAnomaly>,
}

impl Default for BinomialEngine {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            deadline: None,
        }
    }
}

impl BinomialEngine {
    pub const NAME: &'static str = "lattice";

    /// Tree with `steps` time steps.
    ///
    /// # Errors
    ///
    /// [`PricingError::InvalidConfig`] if `steps` is zero.
    pub fn new(steps: usize) -> Result<Self> {
        if steps == 0 {
            return Err(PricingError::InvalidConfig(
                "lattice steps must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            steps,
            deadline: None,
        })
    }

    /// Abort backward induction once `budget` has elapsed.
    pub fn with_deadline(self, budget: Duration) -> Self {
        Self {
            deadline: Some(budget),
            ..self
        }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Price the contract and report numeric anomalies instead of only logging them.
    pub fn price_with_diagnostics(
        &self,
        option: &OptionContract,
        market: &MarketEnvironment,
    ) -> Result<LatticeOutcome> {
        if is_expired(option) {
            return Ok(LatticeOutcome {
                price: option.intrinsic_value(),
                anomaly: None,
            });
        }

        let started = Instant::now();
        let n = self.steps;
        let spot = option.spot();
        let strike = option.strike();
        let option_type = option.option_type();
        let american = option.style() == ExerciseStyle::American;

        let dt = option.maturity() / n as f64;
        let u = (market.volatility() * dt.sqrt()).exp();
        let d = 1.0 / u;
        let growth = ((market.risk_free_rate() - market.dividend_yield()) * dt).exp();
        let p = (growth - d) / (u - d);
        let discount = (-market.risk_free_rate() * dt).exp();

        let anomaly = if (0.0..=1.0).contains(&p) {
            None
        } else {
            let anomaly = NumericAnomaly::ProbabilityOutOfRange { p };
            warn!(engine = Self::NAME, steps = n, %anomaly, "lattice probability is not a probability");
            Some(anomaly)
        };

        // Terminal layer: node i sits at S·u^(N-i)·d^i
        let mut values: Vec<f64> = (0..=n)
            .map(|i| {
                let node_spot = spot * u.powi((n - i) as i32) * d.powi(i as i32);
                option_type.intrinsic(node_spot, strike)
            })
            .collect();

        for j in (0..n).rev() {
            if let Some(budget) = self.deadline {
                if started.elapsed() > budget {
                    return Err(PricingError::DeadlineExceeded {
                        completed_layers: n - 1 - j,
                        steps: n,
                    });
                }
            }

            // Ascending i reads values[i + 1] before it is overwritten
            for i in 0..=j {
                let continuation = discount * (p * values[i] + (1.0 - p) * values[i + 1]);
                values[i] = if american {
                    let node_spot = spot * u.powi((j - i) as i32) * d.powi(i as i32);
                    continuation.max(option_type.intrinsic(node_spot, strike))
                } else {
                    continuation
                };
            }
        }

        let price = values[0];
        debug!(engine = Self::NAME, steps = n, p, price, "lattice price");
        Ok(LatticeOutcome { price, anomaly })
    }
}

impl PricingEngine for BinomialEngine {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn price(&self, option: &OptionContract, market: &MarketEnvironment) -> Result<f64> {
        self.price_with_diagnostics(option, market)
            .map(|outcome| outcome.price)
    }

    // No lattice Greeks; finite differences are composed by the caller.
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::types::OptionType;
    use approx::assert_abs_diff_eq;

    fn market() -> MarketEnvironment {
        MarketEnvironment::new(0.05, 0.2, 0.0).unwrap()
    }

    #[test]
    fn test_zero_steps_rejected() {
        assert!(matches!(
            BinomialEngine::new(0),
            Err(PricingError::InvalidConfig(_))
        ));
        assert_eq!(BinomialEngine::default().steps(), DEFAULT_STEPS);
    }

    #[test]
    fn test_single_step_tree_by_hand() {
        let option =
            OptionContract::new(100.0, 100.0, 1.0, OptionType::Call, ExerciseStyle::European)
                .unwrap();
        let u = 0.2f64.exp();
        let d = 1.0 / u;
        let p = (0.05f64.exp() - d) / (u - d);
        let expected = (-0.05f64).exp() * p * (100.0 * u - 100.0);

        let price = BinomialEngine::new(1).unwrap().price(&option, &market()).unwrap();
        assert_abs_diff_eq!(price, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_two_step_american_put_by_hand() {
        let option =
            OptionContract::new(100.0, 110.0, 1.0, OptionType::Put, ExerciseStyle::American)
                .unwrap();
        let dt = 0.5f64;
        let u = (0.2 * dt.sqrt()).exp();
        let d = 1.0 / u;
        let p = ((0.05 * dt).exp() - d) / (u - d);
        let disc = (-0.05 * dt).exp();

        let put = |s: f64| (110.0 - s).max(0.0);
        let v_uu = put(100.0 * u * u);
        let v_ud = put(100.0);
        let v_dd = put(100.0 * d * d);
        let v_u = (disc * (p * v_uu + (1.0 - p) * v_ud)).max(put(100.0 * u));
        let v_d = (disc * (p * v_ud + (1.0 - p) * v_dd)).max(put(100.0 * d));
        let expected = (disc * (p * v_u + (1.0 - p) * v_d)).max(put(100.0));

        let price = BinomialEngine::new(2).unwrap().price(&option, &market()).unwrap();
        assert_abs_diff_eq!(price, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_expired_contract_is_intrinsic() {
        let option =
            OptionContract::new(80.0, 100.0, 0.0, OptionType::Put, ExerciseStyle::American)
                .unwrap();
        let outcome = BinomialEngine::default()
            .price_with_diagnostics(&option, &market())
            .unwrap();
        assert_eq!(outcome.price, 20.0);
        assert!(outcome.anomaly.is_none());
    }

    #[test]
    fn test_probability_out_of_range_is_reported_not_clamped() {
        // σ√Δt far below (r - q)Δt pushes p above 1
        let market = MarketEnvironment::new(0.10, 0.001, 0.0).unwrap();
        let option =
            OptionContract::new(100.0, 100.0, 1.0, OptionType::Call, ExerciseStyle::European)
                .unwrap();
        let outcome = BinomialEngine::new(10)
            .unwrap()
            .price_with_diagnostics(&option, &market)
            .unwrap();

        match outcome.anomaly {
            Some(NumericAnomaly::ProbabilityOutOfRange { p }) => assert!(p > 1.0),
            other => panic!("expected out-of-range probability, got {other:?}"),
        }
        assert!(outcome.price.is_finite());
    }

    #[test]
    fn test_deadline_exceeded() {
        let option =
            OptionContract::new(100.0, 100.0, 1.0, OptionType::Put, ExerciseStyle::American)
                .unwrap();
        let engine = BinomialEngine::new(2_000)
            .unwrap()
            .with_deadline(Duration::ZERO);
        assert!(matches!(
            engine.price(&option, &market()),
            Err(PricingError::DeadlineExceeded { steps: 2_000, .. })
        ));
    }

    #[test]
    fn test_generous_deadline_does_not_change_price() {
        let option =
            OptionContract::new(100.0, 100.0, 1.0, OptionType::Put, ExerciseStyle::American)
                .unwrap();
        let plain = BinomialEngine::new(200).unwrap();
        let bounded = plain.with_deadline(Duration::from_secs(60));
        assert_eq!(
            plain.price(&option, &market()).unwrap(),
            bounded.price(&option, &market()).unwrap()
        );
    }

    #[test]
    fn test_lattice_has_no_greeks() {
        let option =
            OptionContract::new(100.0, 100.0, 1.0, OptionType::Call, ExerciseStyle::European)
                .unwrap();
        assert!(BinomialEngine::default().greeks(&option, &market()).is_none());
    }
}
