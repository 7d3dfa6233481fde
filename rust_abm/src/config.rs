use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Rule that turns a firm's trailing statistic into an exit decision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitThreshold {
    /// Exit when no customers were served over the participation window.
    NoCustomers,
    /// Exit when the average market share falls below the given floor.
    MinShare(f64),
}

impl ExitThreshold {
    /// Whether a trailing statistic is at or below the viability threshold.
    pub fn is_unviable(&self, trailing: f64) -> bool {
        match *self {
            ExitThreshold::NoCustomers => trailing <= 0.0,
            ExitThreshold::MinShare(min) => trailing < min,
        }
    }
}

/// Configuration record for one sector population.
///
/// The same engine runs both sectors; everything that differs between
/// capital-goods and consumption-goods producers lives here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SectorConfig {
    pub name: String,
    pub initial_firms: usize,

    // Entry/exit
    pub min_wealth: f64,
    pub participation_window: usize,
    pub min_tenure: u64,
    pub exit_threshold: ExitThreshold,
    /// Share each entrant brings in before the sector is rescaled.
    pub entrant_share: f64,

    // Labour
    pub max_labor_shortage: f64,
    pub rd_max_share: f64,

    // Initial / entrant firm parameters
    pub initial_wealth: f64,
    pub initial_price: f64,
    pub initial_capacity: f64,
    pub productivity: f64,
    pub markup: f64,
}

impl SectorConfig {
    pub fn capital_goods() -> Self {
        SectorConfig {
            name: "capital".to_string(),
            initial_firms: 20,
            min_wealth: 1_000.0,
            participation_window: 20,
            min_tenure: 20,
            exit_threshold: ExitThreshold::NoCustomers,
            entrant_share: 0.05,
            max_labor_shortage: 0.5,
            rd_max_share: 0.04,
            initial_wealth: 2_000.0,
            initial_price: 1.2,
            initial_capacity: 150.0,
            productivity: 1.0,
            markup: 0.1,
        }
    }

    pub fn consumption_goods() -> Self {
        SectorConfig {
            name: "consumption".to_string(),
            initial_firms: 100,
            min_wealth: 1_000.0,
            participation_window: 20,
            min_tenure: 4,
            exit_threshold: ExitThreshold::MinShare(1e-5),
            entrant_share: 0.01,
            max_labor_shortage: 0.5,
            rd_max_share: 0.0,
            initial_wealth: 2_000.0,
            initial_price: 1.2,
            initial_capacity: 100.0,
            productivity: 1.0,
            markup: 0.2,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |ok: bool, field: &'static str| {
            if ok {
                Ok(())
            } else {
                Err(ConfigError::NonPositive {
                    sector: self.name.clone(),
                    field,
                })
            }
        };
        positive(self.initial_firms > 0, "initial_firms")?;
        positive(self.participation_window > 0, "participation_window")?;
        positive(self.initial_price > 0.0, "initial_price")?;
        positive(self.productivity > 0.0, "productivity")?;
        positive(self.initial_capacity > 0.0, "initial_capacity")?;

        for (field, value) in [
            ("entrant_share", self.entrant_share),
            ("max_labor_shortage", self.max_labor_shortage),
            ("rd_max_share", self.rd_max_share),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange {
                    sector: self.name.clone(),
                    field,
                    value,
                });
            }
        }
        if let ExitThreshold::MinShare(min) = self.exit_threshold {
            if !(0.0..=1.0).contains(&min) {
                return Err(ConfigError::OutOfUnitRange {
                    sector: self.name.clone(),
                    field: "exit_threshold",
                    value: min,
                });
            }
        }
        if self.min_wealth < 0.0 {
            return Err(ConfigError::Negative {
                field: "min_wealth",
                value: self.min_wealth,
            });
        }
        Ok(())
    }
}

impl Default for SectorConfig {
    fn default() -> Self {
        SectorConfig::consumption_goods()
    }
}

/// Configuration parameters for a two-sector simulation run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capital: SectorConfig,
    pub consumption: SectorConfig,

    // Labour market
    pub labor_supply: f64,
    pub wage: f64,

    // Demand side
    pub propensity_to_consume: f64,
    pub autonomous_demand: f64,
    pub investment_ratio: f64,
    pub rd_ratio: f64,

    // Firm behaviour
    pub markup_adjustment_speed: f64,
    pub share_dynamics: f64,
    pub unfilled_weight: f64,
    pub capital_share_smoothing: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            capital: SectorConfig::capital_goods(),
            consumption: SectorConfig::consumption_goods(),

            labor_supply: 14_000.0,
            wage: 1.0,

            propensity_to_consume: 1.0,
            autonomous_demand: 1_500.0,
            investment_ratio: 0.15,
            rd_ratio: 0.04,

            markup_adjustment_speed: 0.05,
            share_dynamics: 0.5,
            unfilled_weight: 1.0,
            capital_share_smoothing: 0.5,
        }
    }
}

impl Config {
    /// Parse a JSON document, filling missing top-level fields from defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.capital.validate()?;
        self.consumption.validate()?;

        for (field, value) in [
            ("labor_supply", self.labor_supply),
            ("wage", self.wage),
            ("autonomous_demand", self.autonomous_demand),
            ("investment_ratio", self.investment_ratio),
            ("rd_ratio", self.rd_ratio),
            ("markup_adjustment_speed", self.markup_adjustment_speed),
            ("share_dynamics", self.share_dynamics),
            ("unfilled_weight", self.unfilled_weight),
        ] {
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        if !(0.0..=1.0).contains(&self.capital_share_smoothing) {
            return Err(ConfigError::OutOfUnitRange {
                sector: self.capital.name.clone(),
                field: "capital_share_smoothing",
                value: self.capital_share_smoothing,
            });
        }
        Ok(())
    }
}
