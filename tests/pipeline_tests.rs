
use option_pricer::pricing::batch::{price_csv_file, write_entries};
use option_pricer::{
    default_configs, price_with_engine, AmericanFallback, EngineKind, ExerciseStyle, GreeksMode,
    OptionType, PricerConfig, PricingError, PricingWarning,
};
use test_utils::{american, european, standard_market, write_temp_file};

#[test]
fn test_config_file_roundtrip_into_pricing() {
    let path = write_temp_file(
        "pricer.toml",
        r#"
engine = "lattice"
lattice_steps = 400
american_fallback = "reject"
greeks = "off"
parallel = false
"#,
    );
    let config = PricerConfig::from_file(&path).unwrap();
    assert_eq!(config.engine, EngineKind::Lattice);
    assert_eq!(config.greeks, GreeksMode::Off);

    let report = option_pricer::price_request(
        &option_pricer::PricingRequest::new(
            american(90.0, 100.0, 1.0, OptionType::Put),
            standard_market(),
        ),
        &config,
    )
    .unwrap();
    assert_eq!(report.engine, "lattice");
    assert!(report.greeks.is_none());
    assert!(report.warnings.is_empty());
}

#[test]
fn test_missing_config_file_reports_path() {
    let err = PricerConfig::from_file("/nonexistent/pricer.toml").unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/pricer.toml"));
}

#[test]
fn test_price_with_engine_names() {
    let config = default_configs::fast();
    let option = european(100.0, 100.0, 1.0, OptionType::Call);

    let closed = price_with_engine(option, standard_market(), "closed_form", &config).unwrap();
    let bs = price_with_engine(option, standard_market(), "bs", &config).unwrap();
    assert_eq!(closed, bs);
    assert!((closed.price - 10.4506).abs() < 1e-4);

    let greeks = closed.greeks.unwrap().to_map();
    assert!(greeks.contains_key("delta") && greeks.contains_key("vega"));

    let lattice = price_with_engine(option, standard_market(), "lattice", &config).unwrap();
    assert_eq!(lattice.engine, "lattice");
    assert!((lattice.price - closed.price).abs() < 0.05);

    assert!(matches!(
        price_with_engine(option, standard_market(), "monte_carlo", &config),
        Err(PricingError::InvalidConfig(_))
    ));
}

#[test]
fn test_downgrade_warning_is_visible_to_presenter() {
    let report = price_with_engine(
        american(100.0, 100.0, 1.0, OptionType::Put),
        standard_market(),
        "bs",
        &PricerConfig::default(),
    )
    .unwrap();
    assert_eq!(report.option.style(), ExerciseStyle::European);
    assert_eq!(report.warnings, vec![PricingWarning::DowngradedToEuropean]);
    assert!(report.warnings[0].to_string().contains("European"));
}

#[test]
fn test_routing_to_lattice() {
    let config = PricerConfig {
        american_fallback: AmericanFallback::Lattice,
        lattice_steps: 150,
        ..PricerConfig::default()
    };
    let report = price_with_engine(
        american(100.0, 100.0, 1.0, OptionType::Put),
        standard_market(),
        "closed_form",
        &config,
    )
    .unwrap();
    assert_eq!(report.engine, "lattice");
    assert_eq!(
        report.warnings,
        vec![PricingWarning::RoutedToLattice { steps: 150 }]
    );
    // American put is worth more than the European closed-form value
    assert!(report.price > 5.5735);
}

#[test]
fn test_batch_file_end_to_end() {
    let input = write_temp_file(
        "batch.csv",
        "spot,strike,maturity,option_type,style,rate,volatility,dividend_yield,engine\n\
         100,100,1,call,european,0.05,0.2,0,bs\n\
         80,100,1,put,american,0.05,0.2,0,lattice\n\
         100,100,1,put,american,0.05,0.2,0,closed_form\n\
         100,100,-1,put,european,0.05,0.2,0,lattice\n",
    );
    let config = default_configs::minimal();
    let entries = price_csv_file(&input, &config).unwrap();
    assert_eq!(entries.len(), 4);
    assert!(entries[0].result.is_ok());
    assert!(entries[1].result.as_ref().unwrap().price >= 20.0);
    let downgraded = entries[2].result.as_ref().unwrap();
    assert_eq!(downgraded.warnings, vec![PricingWarning::DowngradedToEuropean]);
    assert!(matches!(
        entries[3].result,
        Err(PricingError::InvalidParameter(_))
    ));

    let mut out = Vec::new();
    write_entries(&mut out, &entries).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert!(text.contains("priced as European"));
}

#[test]
fn test_missing_batch_file() {
    assert!(price_csv_file("/nonexistent/batch.csv", &PricerConfig::default()).is_err());
}
