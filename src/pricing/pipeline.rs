//! Caller-level orchestration around the engines: engine selection policy,
//! finite-difference Greeks and model comparison studies.
//!
//! The engines themselves never substitute one exercise style for another;
//! any such adjustment happens here and is reported as a [`PricingWarning`].

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::bs::BlackScholesEngine;
use crate::models::engine::{Engine, EngineKind};
use crate::models::lattice::BinomialEngine;
use crate::models::traits::PricingEngine;
use crate::models::utils::is_expired;
use crate::pricing::config::{AmericanFallback, BumpConfig, GreeksMode, PricerConfig};
use crate::pricing::types::{
    ExerciseStyle, Greeks, MarketEnvironment, OptionContract, PricingReport, PricingWarning,
};

/// One pricing request as produced by an input collector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingRequest {
    pub option: OptionContract,
    pub market: MarketEnvironment,
    /// Engine to use; `None` takes the config's default
    pub engine: Option<EngineKind>,
}

impl PricingRequest {
    pub fn new(option: OptionContract, market: MarketEnvironment) -> Self {
        Self {
            option,
            market,
            engine: None,
        }
    }

    pub fn with_engine(self, engine: EngineKind) -> Self {
        Self {
            engine: Some(engine),
            ..self
        }
    }
}

/// Resolve the engine and contract to price, applying the American fallback policy.
pub fn select_engine(
    request: &PricingRequest,
    config: &PricerConfig,
) -> Result<(Engine, OptionContract, Vec<PricingWarning>)> {
    let mut kind = request.engine.unwrap_or(config.engine);
    let mut option = request.option;
    let mut warnings = Vec::new();

    if kind == EngineKind::ClosedForm && option.style() == ExerciseStyle::American {
        match config.american_fallback {
            AmericanFallback::Downgrade => {
                warn!("closed-form engine does not support American options; switching to European style");
                option = option.with_style(ExerciseStyle::European);
                warnings.push(PricingWarning::DowngradedToEuropean);
            }
            AmericanFallback::Lattice => {
                warn!(
                    steps = config.lattice_steps,
                    "American option routed to the lattice engine"
                );
                kind = EngineKind::Lattice;
                warnings.push(PricingWarning::RoutedToLattice {
                    steps: config.lattice_steps,
                });
            }
            // The engine raises UnsupportedConfiguration itself
            AmericanFallback::Reject => {}
        }
    }

    Ok((config.build_engine(kind)?, option, warnings))
}

/// Price one request end to end.
pub fn price_request(request: &PricingRequest, config: &PricerConfig) -> Result<PricingReport> {
    let (engine, option, mut warnings) = select_engine(request, config)?;
    let market = request.market;

    let outcome = engine.price_with_diagnostics(&option, &market)?;
    if let Some(anomaly) = outcome.anomaly {
        warnings.push(PricingWarning::NumericAnomaly {
            detail: anomaly.to_string(),
        });
    }

    let greeks = match config.greeks {
        GreeksMode::Off => None,
        GreeksMode::Analytic => engine.greeks(&option, &market),
        GreeksMode::FiniteDifference => match engine.greeks(&option, &market) {
            Some(greeks) => Some(greeks),
            None => {
                warnings.push(PricingWarning::FiniteDifferenceGreeks);
                Some(finite_difference_greeks(
                    &engine,
                    &option,
                    &market,
                    &config.bumps,
                )?)
            }
        },
    };

    debug!(
        engine = engine.name(),
        price = outcome.price,
        warnings = warnings.len(),
        "request priced"
    );

    Ok(PricingReport {
        engine: engine.name(),
        option,
        market,
        price: outcome.price,
        greeks,
        warnings,
    })
}

/// Price many requests; results keep the input order.
pub fn price_requests(
    requests: &[PricingRequest],
    config: &PricerConfig,
) -> Vec<Result<PricingReport>> {
    if config.parallel {
        requests
            .par_iter()
            .map(|request| price_request(request, config))
            .collect()
    } else {
        requests
            .iter()
            .map(|request| price_request(request, config))
            .collect()
    }
}

/// Delta and vega by bump-and-reprice.
///
/// Central differences where the bumped-down input stays valid, forward
/// differences otherwise. Expired contracts get zero sensitivities, matching
/// the analytic engine.
pub fn finite_difference_greeks(
    engine: &dyn PricingEngine,
    option: &OptionContract,
    market: &MarketEnvironment,
    bumps: &BumpConfig,
) -> Result<Greeks> {
    if is_expired(option) {
        return Ok(Greeks {
            delta: 0.0,
            vega: 0.0,
        });
    }

    let spot = option.spot();
    let h = if spot > 0.0 {
        spot * bumps.spot_rel
    } else {
        bumps.spot_rel
    };
    let up = engine.price(&option.with_spot(spot + h)?, market)?;
    let delta = if spot - h >= 0.0 {
        let down = engine.price(&option.with_spot(spot - h)?, market)?;
        (up - down) / (2.0 * h)
    } else {
        (up - engine.price(option, market)?) / h
    };

    let sigma = market.volatility();
    let dv = bumps.vol_abs;
    let up = engine.price(option, &market.with_volatility(sigma + dv)?)?;
    // Zero volatility is degenerate on the lattice, so keep the down bump above it
    let vega = if sigma - dv > 0.0 {
        let down = engine.price(option, &market.with_volatility(sigma - dv)?)?;
        (up - down) / (2.0 * dv)
    } else {
        (up - engine.price(option, market)?) / dv
    };

    Ok(Greeks { delta, vega })
}

/// One row of a lattice-vs-closed-form comparison
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ConvergenceRow {
    pub steps: usize,
    pub lattice_price: f64,
    pub abs_error: f64,
}

/// Closed-form reference and lattice prices at each step count
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ConvergenceStudy {
    pub reference_price: f64,
    pub rows: Vec<ConvergenceRow>,
}

/// Compare lattice prices against the closed-form price of a European contract.
pub fn convergence_table(
    option: &OptionContract,
    market: &MarketEnvironment,
    step_counts: &[usize],
) -> Result<ConvergenceStudy> {
    let reference_price = BlackScholesEngine.price(option, market)?;
    let rows = step_counts
        .iter()
        .map(|&steps| -> Result<ConvergenceRow> {
            let lattice_price = BinomialEngine::new(steps)?.price(option, market)?;
            Ok(ConvergenceRow {
                steps,
                lattice_price,
                abs_error: (lattice_price - reference_price).abs(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ConvergenceStudy {
        reference_price,
        rows,
    })
}

/// European and American lattice values of the same contract
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EarlyExercisePremium {
    pub european: f64,
    pub american: f64,
    pub premium: f64,
}

/// Value of the right to exercise early, measured on one lattice.
pub fn early_exercise_premium(
    option: &OptionContract,
    market: &MarketEnvironment,
    engine: &BinomialEngine,
) -> Result<EarlyExercisePremium> {
    let european = engine.price(&option.with_style(ExerciseStyle::European), market)?;
    let american = engine.price(&option.with_style(ExerciseStyle::American), market)?;
    Ok(EarlyExercisePremium {
        european,
        american,
        premium: american - european,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PricingError;
    use crate::pricing::types::OptionType;
    use approx::assert_abs_diff_eq;

    fn american_put() -> PricingRequest {
        PricingRequest::new(
            OptionContract::new(80.0, 100.0, 1.0, OptionType::Put, ExerciseStyle::American)
                .unwrap(),
            MarketEnvironment::new(0.05, 0.2, 0.0).unwrap(),
        )
    }

    #[test]
    fn test_downgrade_policy() {
        let config = PricerConfig::default();
        let report = price_request(&american_put(), &config).unwrap();
        assert_eq!(report.engine, "closed_form");
        assert_eq!(report.option.style(), ExerciseStyle::European);
        assert_eq!(report.warnings, vec![PricingWarning::DowngradedToEuropean]);
        assert!(report.greeks.is_some());
    }

    #[test]
    fn test_lattice_policy() {
        let config = PricerConfig {
            american_fallback: AmericanFallback::Lattice,
            ..PricerConfig::default()
        };
        let report = price_request(&american_put(), &config).unwrap();
        assert_eq!(report.engine, "lattice");
        assert_eq!(report.option.style(), ExerciseStyle::American);
        assert!(report.price > 20.0 - 1e-12);
        assert!(report.greeks.is_none());
    }

    #[test]
    fn test_reject_policy() {
        let config = PricerConfig {
            american_fallback: AmericanFallback::Reject,
            ..PricerConfig::default()
        };
        assert!(matches!(
            price_request(&american_put(), &config),
            Err(PricingError::UnsupportedConfiguration { .. })
        ));
    }

    #[test]
    fn test_finite_difference_matches_analytic() {
        let option =
            OptionContract::new(100.0, 105.0, 0.75, OptionType::Call, ExerciseStyle::European)
                .unwrap();
        let market = MarketEnvironment::new(0.03, 0.25, 0.01).unwrap();
        let analytic = BlackScholesEngine.greeks(&option, &market).unwrap();
        let bumps = BumpConfig {
            spot_rel: 1e-4,
            vol_abs: 1e-4,
        };
        let fd = finite_difference_greeks(&BlackScholesEngine, &option, &market, &bumps).unwrap();
        assert_abs_diff_eq!(fd.delta, analytic.delta, epsilon = 1e-6);
        assert_abs_diff_eq!(fd.vega, analytic.vega, epsilon = 1e-4);
    }

    #[test]
    fn test_finite_difference_on_lattice_is_requested_by_config() {
        let config = PricerConfig {
            greeks: GreeksMode::FiniteDifference,
            lattice_steps: 200,
            ..PricerConfig::default()
        };
        let request = PricingRequest::new(
            OptionContract::new(100.0, 100.0, 1.0, OptionType::Put, ExerciseStyle::American)
                .unwrap(),
            MarketEnvironment::new(0.05, 0.2, 0.0).unwrap(),
        )
        .with_engine(EngineKind::Lattice);
        let report = price_request(&request, &config).unwrap();
        let greeks = report.greeks.unwrap();
        assert!(greeks.delta < -0.2 && greeks.delta > -0.6);
        assert!(greeks.vega > 10.0);
        assert!(report
            .warnings
            .contains(&PricingWarning::FiniteDifferenceGreeks));
    }

    #[test]
    fn test_finite_difference_forward_at_low_volatility() {
        let option =
            OptionContract::new(100.0, 100.0, 1.0, OptionType::Call, ExerciseStyle::European)
                .unwrap();
        let market = MarketEnvironment::new(0.05, 0.005, 0.0).unwrap();
        let fd = finite_difference_greeks(
            &BlackScholesEngine,
            &option,
            &market,
            &BumpConfig::default(),
        )
        .unwrap();
        assert!(fd.vega.is_finite());
    }

    #[test]
    fn test_finite_difference_vega_when_volatility_equals_bump() {
        let config = PricerConfig::production();
        let request = PricingRequest::new(
            OptionContract::new(100.0, 100.0, 1.0, OptionType::Call, ExerciseStyle::European)
                .unwrap(),
            MarketEnvironment::new(0.05, config.bumps.vol_abs, 0.0).unwrap(),
        )
        .with_engine(EngineKind::Lattice);
        let report = price_request(&request, &config).unwrap();
        let greeks = report.greeks.unwrap();
        assert!(greeks.delta.is_finite());
        assert!(greeks.vega.is_finite());
    }

    #[test]
    fn test_batch_keeps_order() {
        let market = MarketEnvironment::new(0.05, 0.2, 0.0).unwrap();
        let requests: Vec<PricingRequest> = [80.0, 90.0, 100.0, 110.0, 120.0]
            .iter()
            .map(|&spot| {
                PricingRequest::new(
                    OptionContract::new(spot, 100.0, 1.0, OptionType::Call, ExerciseStyle::European)
                        .unwrap(),
                    market,
                )
            })
            .collect();

        let parallel = price_requests(&requests, &PricerConfig::default());
        let sequential = price_requests(
            &requests,
            &PricerConfig {
                parallel: false,
                ..PricerConfig::default()
            },
        );
        let prices: Vec<f64> = parallel.iter().map(|r| r.as_ref().unwrap().price).collect();
        assert!(prices.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_convergence_table_shape() {
        let option =
            OptionContract::new(100.0, 100.0, 1.0, OptionType::Call, ExerciseStyle::European)
                .unwrap();
        let market = MarketEnvironment::new(0.05, 0.2, 0.0).unwrap();
        let study = convergence_table(&option, &market, &[10, 100]).unwrap();
        assert_eq!(study.rows.len(), 2);
        assert_abs_diff_eq!(study.reference_price, 10.450_583_572_185_565, epsilon = 1e-9);
        assert!(study.rows[1].abs_error < study.rows[0].abs_error);
        assert!(convergence_table(&option, &market, &[0]).is_err());
    }
}
