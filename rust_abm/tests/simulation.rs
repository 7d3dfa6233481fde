use ks_sector_engine::markets::clear_goods_markets;
use ks_sector_engine::{
    run_simulation, Config, EconomyState, ExitThreshold, Firm, SectorError, SimulationError,
};

fn small_config() -> Config {
    let mut config = Config::default();
    config.capital.initial_firms = 5;
    config.consumption.initial_firms = 20;
    config.labor_supply = 3_000.0;
    config.autonomous_demand = 300.0;
    config
}

#[test]
fn population_size_is_closed() {
    let config = small_config();
    let records = run_simulation(config, 60, 7).unwrap();

    assert_eq!(records.len(), 60);
    for (i, r) in records.iter().enumerate() {
        assert_eq!(r.period, i as u64 + 1);
        assert_eq!(r.capital_firms, 5);
        assert_eq!(r.consumption_firms, 20);
        assert!(r.cpi.is_finite() && r.cpi > 0.0);
        assert!(r.ppi.is_finite() && r.ppi > 0.0);
        assert!((0.0..=1.0).contains(&r.consumption_exit_rate));
        assert!(r.consumption_bankruptcy_rate <= r.consumption_exit_rate);
    }
}

/// A share floor of 0.1 among 20 firms: shares sum to one, so at least
/// half the incumbents sit below it every period.
fn churning_config() -> Config {
    let mut config = small_config();
    config.consumption.exit_threshold = ExitThreshold::MinShare(0.1);
    config.consumption.min_tenure = 2;
    config.consumption.participation_window = 4;
    config
}

#[test]
fn churn_replaces_every_exit() {
    let mut state = EconomyState::new(churning_config(), 5).unwrap();
    for _ in 0..30 {
        state.run_pre_step();
        clear_goods_markets(&mut state).unwrap();
        state.run_post_step();
        assert!(state.fault.is_none());
        state.record();

        assert_eq!(state.consumption.len(), 20);
        let total: f64 = state.consumption.firms().iter().map(|f| f.share()).sum();
        assert!((total - 1.0).abs() < 1e-3);
    }

    // Nobody is eligible in period 1; in period 2 every firm is.
    let exits: Vec<f64> = state.records.iter().map(|r| r.consumption_exit_rate).collect();
    assert_eq!(exits[0], 0.0);
    assert!(exits[1] >= 0.5);
    for r in &state.records {
        assert_eq!(r.consumption_firms, 20);
        assert!(r.consumption_bankruptcy_rate <= r.consumption_exit_rate);
        assert!(r.average_price.is_finite() && r.average_price > 0.0);
        assert!(r.entry_cost >= 0.0);
    }
}

#[test]
fn churn_through_the_schedule() {
    let records = run_simulation(churning_config(), 20, 9).unwrap();
    assert_eq!(records.len(), 20);
    assert!(records.iter().any(|r| r.consumption_exit_rate > 0.0));
    assert!(records.iter().all(|r| r.consumption_firms == 20));
}

#[test]
fn same_seed_same_history() {
    let a = run_simulation(small_config(), 25, 11).unwrap();
    let b = run_simulation(small_config(), 25, 11).unwrap();
    let cpi_a: Vec<f64> = a.iter().map(|r| r.cpi).collect();
    let cpi_b: Vec<f64> = b.iter().map(|r| r.cpi).collect();
    assert_eq!(cpi_a, cpi_b);
}

#[test]
fn shares_stay_normalised_between_periods() {
    let mut state = EconomyState::new(small_config(), 3).unwrap();
    for _ in 0..20 {
        state.run_pre_step();
        clear_goods_markets(&mut state).unwrap();
        state.run_post_step();
        assert!(state.fault.is_none());
        state.record();

        let capital: f64 = state.capital.firms().iter().map(|f| f.share()).sum();
        let consumption: f64 = state.consumption.firms().iter().map(|f| f.share()).sum();
        assert!((capital - 1.0).abs() < 1e-3);
        assert!((consumption - 1.0).abs() < 1e-3);
        for firm in state.consumption.firms() {
            assert!(firm.core.sold <= firm.core.supply + 1e-9);
        }
    }
    assert_eq!(state.records.len(), 20);
}

#[test]
fn negative_demand_is_fatal() {
    let mut state = EconomyState::new(small_config(), 3).unwrap();
    state.run_pre_step();
    state.consumption_demand = -5.0;
    assert!(matches!(
        clear_goods_markets(&mut state),
        Err(SectorError::NegativeDemand { .. })
    ));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let mut config = small_config();
    config.consumption.initial_firms = 0;
    assert!(matches!(
        run_simulation(config, 5, 1),
        Err(SimulationError::Config(_))
    ));
}
