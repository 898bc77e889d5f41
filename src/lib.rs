//! # Option-Pricer: Closed-Form and Lattice Option Valuation
//!
//! `option-pricer` values vanilla calls and puts under the Black-Scholes market
//! model with two interchangeable engines:
//!
//! - **Closed form** ([`BlackScholesEngine`]): analytic European prices plus
//!   delta and vega.
//! - **Lattice** ([`BinomialEngine`]): Cox-Ross-Rubinstein binomial tree with
//!   European and American exercise.
//!
//! Both engines implement [`PricingEngine`]; [`Engine`] selects one of them by
//! name at run time.
//!
//! ## Quick Start
//!
//! ```rust
//! use option_pricer::{
//!     BinomialEngine, BlackScholesEngine, ExerciseStyle, MarketEnvironment, OptionContract,
//!     OptionType, PricingEngine,
//! };
//!
//! let market = MarketEnvironment::new(0.05, 0.2, 0.0)?;
//! let call = OptionContract::new(100.0, 100.0, 1.0, OptionType::Call, ExerciseStyle::European)?;
//!
//! let analytic = BlackScholesEngine.price(&call, &market)?;
//! let lattice = BinomialEngine::new(1000)?.price(&call, &market)?;
//! assert!((analytic - 10.4506).abs() < 1e-4);
//! assert!((analytic - lattice).abs() < 1e-2);
//!
//! let greeks = BlackScholesEngine.greeks(&call, &market).expect("european call has greeks");
//! assert!(greeks.delta > 0.5);
//! # Ok::<(), option_pricer::PricingError>(())
//! ```
//!
//! ## Expiry
//!
//! A contract with maturity at or below [`EXPIRY_EPSILON`] is worth its
//! intrinsic value under every engine.
//!
//! ## Configuration Presets
//!
//! - `production()`: deep lattice with a run-time budget and finite-difference Greeks
//! - `fast()`: 100-step lattice for development
//! - `research()`: 2000-step lattice and fine bumps
//! - `minimal()`: 25-step lattice, sequential batches

// ================================================================================================
// MODULES
// ================================================================================================

pub mod error;
pub mod models;
pub mod pricing;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

// Errors
pub use error::{NumericAnomaly, PricingError, Result};

// Contract and market types
pub use pricing::types::{
    ExerciseStyle, Greeks, MarketEnvironment, OptionContract, OptionType, PricingReport,
    PricingWarning,
};

// Engines
pub use models::bs::BlackScholesEngine;
pub use models::engine::{Engine, EngineKind};
pub use models::lattice::{BinomialEngine, LatticeOutcome};
pub use models::traits::PricingEngine;
pub use models::utils::EXPIRY_EPSILON;

// Configuration and orchestration
pub use pricing::config::{AmericanFallback, BumpConfig, GreeksMode, PricerConfig};
pub use pricing::pipeline::{
    convergence_table, early_exercise_premium, finite_difference_greeks, price_request,
    price_requests, ConvergenceRow, ConvergenceStudy, EarlyExercisePremium, PricingRequest,
};

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured pricer settings for common use cases.
///
/// # Available Configurations
///
/// - [`production()`]: Bounded run time, deep lattice
/// - [`fast()`]: Development defaults
/// - [`research()`]: High-precision lattice
/// - [`minimal()`]: Quick validation settings
pub mod default_configs {
    use crate::pricing::config::PricerConfig;

    /// Production configuration.
    ///
    /// **Characteristics:**
    /// - Lattice steps: 500
    /// - Lattice deadline: 5 seconds
    /// - Finite-difference Greeks when the engine has none
    ///
    /// # Example
    ///
    /// ```rust
    /// use option_pricer::default_configs;
    ///
    /// let config = default_configs::production();
    /// assert_eq!(config.lattice_steps, 500);
    /// ```
    pub fn production() -> PricerConfig {
        PricerConfig::production()
    }

    /// Fast configuration for development and testing (100-step lattice).
    pub fn fast() -> PricerConfig {
        PricerConfig::fast()
    }

    /// High-precision configuration for research and engine comparison.
    ///
    /// **Characteristics:**
    /// - Lattice steps: 2,000
    /// - Bumps: 0.1% spot, 0.001 volatility
    pub fn research() -> PricerConfig {
        PricerConfig::research()
    }

    /// Minimal configuration for quick checks (25-step lattice, no parallelism).
    pub fn minimal() -> PricerConfig {
        PricerConfig::minimal()
    }
}

/// Price a single contract with a named engine and the default policies.
///
/// Convenience wrapper over [`price_request`] for callers that only have an
/// engine name, as an interactive prompt or HTML form would.
///
/// # Arguments
///
/// * `option` - The validated contract
/// * `market` - The validated market environment
/// * `engine` - `"closed_form"` or `"lattice"` (`"bs"` and `"binomial"` are accepted too)
/// * `config` - Lattice depth, American fallback policy and Greeks mode
///
/// # Errors
///
/// * [`PricingError::InvalidConfig`] for an unknown engine name or a bad config
/// * [`PricingError::UnsupportedConfiguration`] for an American contract on the
///   closed-form engine when the config's fallback is `reject`
/// * [`PricingError::DeadlineExceeded`] when a lattice deadline fires
///
/// # Example
///
/// ```rust
/// use option_pricer::{price_with_engine, default_configs, ExerciseStyle, MarketEnvironment,
///     OptionContract, OptionType};
///
/// let market = MarketEnvironment::new(0.05, 0.2, 0.0)?;
/// let put = OptionContract::new(80.0, 100.0, 1.0, OptionType::Put, ExerciseStyle::American)?;
///
/// let report = price_with_engine(put, market, "binomial", &default_configs::fast())?;
/// assert_eq!(report.engine, "lattice");
/// assert!(report.greeks.is_none());
/// # Ok::<(), option_pricer::PricingError>(())
/// ```
pub fn price_with_engine(
    option: OptionContract,
    market: MarketEnvironment,
    engine: &str,
    config: &PricerConfig,
) -> Result<PricingReport> {
    let kind: EngineKind = engine.parse()?;
    price_request(&PricingRequest::new(option, market).with_engine(kind), config)
}
