pub mod bs;
pub mod engine;
pub mod lattice;

/// Common traits implemented by every pricing engine
pub mod traits {
    use crate::error::Result;
    use crate::pricing::types::{Greeks, MarketEnvironment, OptionContract};

    /// Pricing engine contract.
    ///
    /// Engines are stateless across calls: `price` and `greeks` read only their
    /// arguments and the engine's immutable configuration, so a single instance
    /// can be shared between threads.
    pub trait PricingEngine: Send + Sync {
        /// Short machine-friendly name (`"closed_form"`, `"lattice"`).
        fn name(&self) -> &'static str;

        /// Present value of the contract.
        ///
        /// Fails with `UnsupportedConfiguration` when the engine has no method
        /// for the contract's exercise style.
        fn price(&self, option: &OptionContract, market: &MarketEnvironment) -> Result<f64>;

        /// Sensitivities, or `None` when the engine cannot derive them for
        /// this contract.
        fn greeks(&self, _option: &OptionContract, _market: &MarketEnvironment) -> Option<Greeks> {
            None
        }
    }
}

/// Numerical helpers shared by the engines
pub mod utils {
    use crate::pricing::types::OptionContract;

    /// Maturities at or below this are treated as expired by every engine.
    pub const EXPIRY_EPSILON: f64 = 1e-9;

    /// Whether the contract is priced at intrinsic value.
    pub fn is_expired(option: &OptionContract) -> bool {
        option.maturity() <= EXPIRY_EPSILON
    }

    /// Standard normal cumulative distribution function.
    ///
    /// Written in terms of `erfc` so that the lower tail keeps full relative
    /// precision instead of cancelling against 1.
    pub fn normal_cdf(x: f64) -> f64 {
        0.5 * libm::erfc(-x / std::f64::consts::SQRT_2)
    }

    /// Standard normal probability density function.
    pub fn normal_pdf(x: f64) -> f64 {
        const INV_SQRT_2PI: f64 = 0.398_942_280_401_432_7;
        INV_SQRT_2PI * (-0.5 * x * x).exp()
    }

}
