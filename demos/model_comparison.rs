//! Demonstration of closed-form vs lattice pricing
//!
//! This example shows how to:
//! 1. Price a European call with the closed-form engine
//! 2. Watch the binomial lattice converge towards it as steps grow
//! 3. Measure the early-exercise premium of a deep in-the-money American put

use anyhow::Result;
use option_pricer::{
    convergence_table, early_exercise_premium, BinomialEngine, ExerciseStyle, MarketEnvironment,
    OptionContract, OptionType,
};

fn main() -> Result<()> {
    println!("--- Model Comparison: European Call Option ---");

    let market = MarketEnvironment::new(0.05, 0.2, 0.0)?;
    let call = OptionContract::new(100.0, 100.0, 1.0, OptionType::Call, ExerciseStyle::European)?;

    let study = convergence_table(&call, &market, &[10, 50, 100, 500, 1000])?;
    println!("Black-Scholes Price: {:.6}", study.reference_price);

    println!("\n--- Binomial Convergence ---");
    for row in &study.rows {
        println!(
            "Steps: {:4} | Price: {:.6} | Error: {:.6}",
            row.steps, row.lattice_price, row.abs_error
        );
    }

    println!("\n--- American vs European Put (Early Exercise) ---");
    let put = OptionContract::new(80.0, 100.0, 1.0, OptionType::Put, ExerciseStyle::American)?;
    let premium = early_exercise_premium(&put, &market, &BinomialEngine::new(100)?)?;

    println!("European Put Price (Binomial): {:.6}", premium.european);
    println!("American Put Price (Binomial): {:.6}", premium.american);
    println!("Early Exercise Premium:        {:.6}", premium.premium);

    Ok(())
}
