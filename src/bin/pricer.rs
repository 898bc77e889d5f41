//! Option Pricer CLI
//!
//! # Commands
//!
//! - `pricer price` - Price one option from command-line flags
//! - `pricer interactive` - Prompt for the parameters, then price
//! - `pricer batch --input <file.csv>` - Price every row of a CSV file
//! - `pricer compare` - Lattice convergence and early-exercise premium tables

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use option_pricer::models::lattice::DEFAULT_STEPS;
use option_pricer::pricing::batch::{price_csv_file, write_entries};
use option_pricer::{
    convergence_table, early_exercise_premium, price_request, EngineKind, ExerciseStyle,
    MarketEnvironment, OptionContract, OptionType, PricerConfig, PricingReport, PricingRequest,
};

/// Black-Scholes option pricer (closed form and binomial lattice)
#[derive(Parser)]
#[command(name = "pricer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug, Clone)]
struct ContractArgs {
    /// Spot price of the underlying (S0)
    #[arg(long, default_value_t = 100.0)]
    spot: f64,

    /// Strike price (K)
    #[arg(long, default_value_t = 100.0)]
    strike: f64,

    /// Time to maturity in years (T)
    #[arg(long, default_value_t = 1.0)]
    maturity: f64,

    /// Option type: call or put
    #[arg(long = "type", default_value = "call")]
    option_type: OptionType,

    /// Exercise style: european or american
    #[arg(long, default_value = "european")]
    style: ExerciseStyle,

    /// Risk-free rate, continuously compounded (r)
    #[arg(long, default_value_t = 0.05)]
    rate: f64,

    /// Volatility (sigma)
    #[arg(long, default_value_t = 0.2)]
    volatility: f64,

    /// Continuous dividend yield (q)
    #[arg(long, default_value_t = 0.0)]
    dividend_yield: f64,
}

impl ContractArgs {
    fn build(&self) -> Result<(OptionContract, MarketEnvironment)> {
        let option = OptionContract::new(
            self.spot,
            self.strike,
            self.maturity,
            self.option_type,
            self.style,
        )?;
        let market = MarketEnvironment::new(self.rate, self.volatility, self.dividend_yield)?;
        Ok((option, market))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Price one option
    Price {
        #[command(flatten)]
        contract: ContractArgs,

        /// Engine: closed_form (bs) or lattice (binomial); defaults to the config's engine
        #[arg(short, long)]
        engine: Option<EngineKind>,

        /// Lattice depth, overriding the config
        #[arg(short, long)]
        steps: Option<usize>,
    },

    /// Prompt for the contract and market parameters
    Interactive,

    /// Price every row of a CSV file
    Batch {
        /// Input CSV (spot,strike,maturity,option_type,style,rate,volatility[,dividend_yield][,engine])
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compare the lattice with the closed form and show the early-exercise premium
    Compare {
        #[command(flatten)]
        contract: ContractArgs,

        /// Step counts for the convergence table
        #[arg(long, value_delimiter = ',', default_value = "10,50,100,500,1000")]
        steps: Vec<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialise tracing; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_level(cli.verbose)));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let config = match &cli.config {
        Some(path) => PricerConfig::from_file(path)?,
        None => PricerConfig::default(),
    };

    match cli.command {
        Commands::Price {
            contract,
            engine,
            steps,
        } => run_price(&contract, engine, steps, config),
        Commands::Interactive => run_interactive(config),
        Commands::Batch { input, output } => run_batch(&input, output.as_deref(), &config),
        Commands::Compare { contract, steps } => run_compare(&contract, &steps, &config),
    }
}

fn default_log_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

fn run_price(
    contract: &ContractArgs,
    engine: Option<EngineKind>,
    steps: Option<usize>,
    config: PricerConfig,
) -> Result<()> {
    let (option, market) = contract.build()?;
    let request = PricingRequest {
        option,
        market,
        engine,
    };
    info!(engine = %request.engine.unwrap_or(config.engine), "pricing");
    run_request(request, steps, config)
}

fn run_batch(input: &Path, output: Option<&Path>, config: &PricerConfig) -> Result<()> {
    info!("Pricing batch {}", input.display());
    let entries = price_csv_file(input, config)?;
    let failed = entries.iter().filter(|e| e.result.is_err()).count();

    match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_entries(file, &entries)?;
        }
        None => write_entries(io::stdout().lock(), &entries)?,
    }

    info!(rows = entries.len(), failed, "batch complete");
    Ok(())
}

fn run_compare(contract: &ContractArgs, steps: &[usize], config: &PricerConfig) -> Result<()> {
    let (option, market) = contract.build()?;

    let european = option.with_style(ExerciseStyle::European);
    let study = convergence_table(&european, &market, steps)?;
    println!("\n--- Lattice Convergence ({} {}) ---", european.style(), european.option_type());
    println!("Closed-form price: {:.6}", study.reference_price);
    for row in &study.rows {
        println!(
            "Steps: {:5} | Price: {:.6} | Error: {:.6}",
            row.steps, row.lattice_price, row.abs_error
        );
    }

    let engine = config.lattice_engine()?;
    let premium = early_exercise_premium(&option, &market, &engine)?;
    println!("\n--- American vs European ({} steps) ---", engine.steps());
    println!("European price:         {:.6}", premium.european);
    println!("American price:         {:.6}", premium.american);
    println!("Early exercise premium: {:.6}", premium.premium);
    Ok(())
}

/// Presenter: price, then Greeks or a note that none are available.
fn display_report(report: &PricingReport) {
    for warning in &report.warnings {
        println!("\n[WARNING] {warning}");
    }
    println!("\n--- Results ({}) ---", report.engine);
    println!("Option Price: {:.4}", report.price);

    match report.greeks {
        Some(greeks) => {
            println!("\nGreeks:");
            for (name, value) in greeks.to_map() {
                println!("  {}: {:.4}", capitalize(name), value);
            }
        }
        None => println!("\nNo sensitivities available for this engine."),
    }
    println!("\n----------------");
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ------------------------------------------------------------------------------------------------
// Interactive input collection
// ------------------------------------------------------------------------------------------------

/// Upper bound on a typed-in lattice depth
const MAX_INTERACTIVE_STEPS: usize = 100_000;

struct Prompter<R> {
    input: R,
}

impl<R: BufRead> Prompter<R> {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed");
        }
        Ok(line.trim().to_string())
    }

    fn float(&mut self, prompt: &str, default: f64) -> Result<f64> {
        loop {
            let answer = self.read_line(&format!("{prompt} [{default}]: "))?;
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse::<f64>() {
                Ok(value) => return Ok(value),
                Err(_) => println!("Invalid input. Please enter a number."),
            }
        }
    }

    fn steps(&mut self, prompt: &str, default: usize) -> Result<usize> {
        loop {
            let answer = self.read_line(&format!("{prompt} [{default}]: "))?;
            if answer.is_empty() {
                return Ok(default);
            }
            match answer.parse::<usize>() {
                Ok(value) if (1..=MAX_INTERACTIVE_STEPS).contains(&value) => return Ok(value),
                _ => println!(
                    "Invalid input. Please enter a whole number between 1 and {MAX_INTERACTIVE_STEPS}."
                ),
            }
        }
    }

    fn choice<T: std::str::FromStr>(&mut self, prompt: &str, choices: &[&str]) -> Result<T> {
        let listed = choices.join("/");
        loop {
            let answer = self.read_line(&format!("{prompt} ({listed}): "))?;
            match answer.parse::<T>() {
                Ok(value) => return Ok(value),
                Err(_) => println!("Invalid input. Please choose from {listed}."),
            }
        }
    }

    fn collect(&mut self) -> Result<(PricingRequest, Option<usize>)> {
        loop {
            let spot = self.float("Spot Price (S0)", 100.0)?;
            let strike = self.float("Strike Price (K)", 100.0)?;
            let maturity = self.float("Time to Maturity (T in years)", 1.0)?;
            let option_type: OptionType = self.choice("Option Type", &["call", "put"])?;
            let style: ExerciseStyle = self.choice("Option Style", &["european", "american"])?;
            let rate = self.float("Risk-free Rate (r, e.g., 0.05)", 0.05)?;
            let volatility = self.float("Volatility (sigma, e.g., 0.2)", 0.2)?;
            let dividend_yield = self.float("Dividend Yield (q, e.g., 0.0)", 0.0)?;
            let engine: EngineKind = self.choice("Pricing Model", &["closed_form", "lattice"])?;
            let steps = match engine {
                EngineKind::Lattice => Some(self.steps("Binomial Steps", DEFAULT_STEPS)?),
                EngineKind::ClosedForm => None,
            };

            let built = OptionContract::new(spot, strike, maturity, option_type, style).and_then(
                |option| {
                    MarketEnvironment::new(rate, volatility, dividend_yield).map(|market| {
                        PricingRequest::new(option, market).with_engine(engine)
                    })
                },
            );
            match built {
                Ok(request) => return Ok((request, steps)),
                Err(e) => println!("\n{e}. Please re-enter the parameters.\n"),
            }
        }
    }
}

fn run_interactive(config: PricerConfig) -> Result<()> {
    println!("\n--- Option Pricing Engine ---");
    println!("Please enter the parameters for the option and market.\n");

    let stdin = io::stdin();
    let mut prompter = Prompter {
        input: stdin.lock(),
    };
    let (request, steps) = prompter.collect()?;
    run_request(request, steps, config)
}

fn run_request(request: PricingRequest, steps: Option<usize>, mut config: PricerConfig) -> Result<()> {
    if let Some(steps) = steps {
        config.lattice_steps = steps;
        config.validate()?;
    }
    let report = price_request(&request, &config)?;
    display_report(&report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("delta"), "Delta");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_prompter_defaults_and_retry() {
        let input = "\n\n\nput\nfoo\namerican\n\nabc\n0.3\n\nbs\n";
        let mut prompter = Prompter {
            input: input.as_bytes(),
        };
        let (request, steps) = prompter.collect().unwrap();
        assert_eq!(request.option.spot(), 100.0);
        assert_eq!(request.option.option_type(), OptionType::Put);
        assert_eq!(request.option.style(), ExerciseStyle::American);
        assert_eq!(request.market.volatility(), 0.3);
        assert_eq!(request.engine, Some(EngineKind::ClosedForm));
        assert_eq!(steps, None);
    }

    #[test]
    fn test_prompter_rejects_invalid_contract_then_recovers() {
        // First pass has a negative strike; second pass uses defaults with the lattice
        let input = "100\n-5\n1\ncall\neuropean\n0.05\n0.2\n0\nlattice\n50\n\
                     \n\n\ncall\neuropean\n\n\n\nlattice\n\n";
        let mut prompter = Prompter {
            input: input.as_bytes(),
        };
        let (request, steps) = prompter.collect().unwrap();
        assert_eq!(request.option.strike(), 100.0);
        assert_eq!(steps, Some(100));
    }

    #[test]
    fn test_prompter_steps_reprompt_until_whole_number() {
        let input = "\n\n\ncall\neuropean\n\n\n\nlattice\n-5\n2.5\n0\n1e30\n50\n";
        let mut prompter = Prompter {
            input: input.as_bytes(),
        };
        let (request, steps) = prompter.collect().unwrap();
        assert_eq!(request.engine, Some(EngineKind::Lattice));
        assert_eq!(steps, Some(50));
    }

    #[test]
    fn test_prompter_closed_input() {
        let mut prompter = Prompter { input: "".as_bytes() };
        assert!(prompter.collect().is_err());
    }

    #[test]
    fn test_verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["pricer", "price", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(!Cli::try_parse_from(["pricer", "interactive"]).unwrap().verbose);
        assert_eq!(default_log_level(true), "debug");
        assert_eq!(default_log_level(false), "warn");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "pricer", "price", "--type", "put", "--style", "american", "--engine", "binomial",
            "--steps", "250",
        ])
        .unwrap();
        match cli.command {
            Commands::Price {
                contract,
                engine,
                steps,
            } => {
                assert_eq!(contract.option_type, OptionType::Put);
                assert_eq!(contract.style, ExerciseStyle::American);
                assert_eq!(engine, Some(EngineKind::Lattice));
                assert_eq!(steps, Some(250));
            }
            _ => panic!("expected price command"),
        }
    }
}
