use tracing::debug;

/// Labour demand facing the capital-goods sector.
#[derive(Clone, Debug, Default)]
pub struct LaborDemand {
    /// Total labour supply.
    pub supply: f64,
    /// R&D labour demanded by capital-goods firms.
    pub rd_demand: f64,
    /// Cap on R&D labour as a share of supply.
    pub rd_max_share: f64,
    /// Capital-goods labour demand, R&D included.
    pub capital_demand: f64,
    /// Consumption-goods labour demand.
    pub consumption_demand: f64,
    /// Largest shortfall the capital sector may suffer, in [0, 1].
    pub max_shortage: f64,
}

/// How labour was split between the sectors this period.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaborAllocation {
    pub rd: f64,
    pub capital: f64,
    /// Fraction of non-R&D capital-goods labour demand that was filled.
    pub capital_factor: f64,
    pub consumption: f64,
    /// Fraction of consumption-goods labour demand that was filled.
    pub consumption_factor: f64,
}

/// Capital-goods employment: R&D first, then production labour scaled by
/// the economy-wide shortage factor, never worse than `1 - max_shortage`.
///
/// Returns `(rd, employed, shortage_factor)`.
pub fn capital_sector_labor(d: &LaborDemand) -> (f64, f64, f64) {
    let supply = d.supply.max(0.0);
    let rd = d.rd_demand.min(supply * d.rd_max_share).min(supply);
    let own = d.capital_demand.min(supply);
    let other = d.consumption_demand.min(supply);

    let factor = if supply - rd < own + other {
        ((supply - rd) / (own + other)).max(1.0 - d.max_shortage)
    } else {
        1.0
    };

    (rd, rd + (own - rd) * factor, factor)
}

/// Consumption-goods employment: whatever the capital sector left over,
/// up to demand.
pub fn consumption_sector_labor(supply: f64, capital_employed: f64, demand: f64) -> f64 {
    demand.min(supply - capital_employed).max(0.0)
}

/// Allocate labour for the period. The capital sector is always served
/// first; the consumption sector gets the residual.
pub fn allocate_labor(d: &LaborDemand) -> LaborAllocation {
    let (rd, capital, capital_factor) = capital_sector_labor(d);
    let consumption = consumption_sector_labor(d.supply, capital, d.consumption_demand);
    let consumption_factor = if d.consumption_demand > 0.0 {
        consumption / d.consumption_demand
    } else {
        1.0
    };

    debug!(
        target: "economy.labor",
        supply = d.supply,
        rd,
        capital,
        consumption,
        capital_factor,
        consumption_factor,
        "labour allocated"
    );

    LaborAllocation {
        rd,
        capital,
        capital_factor,
        consumption,
        consumption_factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand(supply: f64, capital: f64, consumption: f64) -> LaborDemand {
        LaborDemand {
            supply,
            rd_demand: 10.0,
            rd_max_share: 0.04,
            capital_demand: capital,
            consumption_demand: consumption,
            max_shortage: 0.5,
        }
    }

    #[test]
    fn no_shortage_fills_everything() {
        let a = allocate_labor(&demand(1_000.0, 200.0, 500.0));
        assert_eq!(a.rd, 10.0);
        assert_eq!(a.capital, 200.0);
        assert_eq!(a.capital_factor, 1.0);
        assert_eq!(a.consumption, 500.0);
        assert_eq!(a.consumption_factor, 1.0);
    }

    #[test]
    fn shortage_scales_capital_production_labour() {
        // (1000 - 10) / (400 + 800) = 0.825
        let a = allocate_labor(&demand(1_000.0, 400.0, 800.0));
        assert!((a.capital_factor - 0.825).abs() < 1e-12);
        assert!((a.capital - (10.0 + 390.0 * 0.825)).abs() < 1e-9);
        assert!((a.consumption - (1_000.0 - a.capital)).abs() < 1e-9);
    }

    #[test]
    fn shortage_is_capped() {
        let a = allocate_labor(&demand(100.0, 400.0, 800.0));
        assert_eq!(a.capital_factor, 0.5);
    }

    #[test]
    fn rd_is_capped_by_supply_share() {
        let mut d = demand(100.0, 50.0, 10.0);
        d.rd_demand = 30.0;
        let (rd, _, _) = capital_sector_labor(&d);
        assert_eq!(rd, 4.0);
    }
}
