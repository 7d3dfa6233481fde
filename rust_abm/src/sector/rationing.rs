use tracing::debug;

use crate::agents::Firm;
use crate::error::SectorError;

/// Remaining nominal demand at or below this is considered cleared.
pub const DEMAND_TOLERANCE: f64 = 0.01;

/// Result of one market-clearing pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RationingOutcome {
    pub rounds: usize,
    /// Total real quantity sold across all firms.
    pub quantity: f64,
    /// Nominal value of what was sold.
    pub revenue: f64,
    /// Demand lost because no firm had stock left; 0 when fully cleared.
    pub unmet_demand: f64,
}

/// Allocate nominal `demand` across `firms` in proportion to market share,
/// respecting each firm's available supply.
///
/// Each round offers every still-active firm its share of the remaining
/// demand. Firms that can serve it in full stay active; firms that cannot
/// sell out their stock and drop out, and the remaining shares are
/// renormalised for the next round. Stops when demand is cleared or no
/// firm has stock left; unmet demand is lost, not carried over.
///
/// Writes each firm's quantity sold and its unfilled demand. Only
/// shortfalls hit in the first round are recorded as unfilled demand.
/// Firm shares and supplies are read, never modified; the working copy
/// of the shares is normalised before the first round.
pub fn ration_demand<F: Firm>(
    sector: &str,
    firms: &mut [F],
    demand: f64,
) -> Result<RationingOutcome, SectorError> {
    if demand.is_nan() || demand < 0.0 {
        return Err(SectorError::NegativeDemand {
            sector: sector.to_string(),
            demand,
        });
    }

    let n = firms.len();
    let mut shares = Vec::with_capacity(n);
    let mut prices = Vec::with_capacity(n);
    let mut stock = Vec::with_capacity(n);

    for firm in firms.iter_mut() {
        let supply = firm.supply();
        if supply.is_nan() || supply < 0.0 {
            return Err(SectorError::NegativeSupply {
                sector: sector.to_string(),
                id: firm.id(),
                supply,
            });
        }
        if firm.share() > 0.0 && !(firm.price() > 0.0) {
            return Err(SectorError::NonPositivePrice {
                sector: sector.to_string(),
                id: firm.id(),
                price: firm.price(),
            });
        }
        shares.push(firm.share().max(0.0));
        prices.push(firm.price());
        stock.push(supply);

        let core = firm.core_mut();
        core.sold = 0.0;
        core.unfilled = 0.0;
    }

    let total_share: f64 = shares.iter().sum();
    if total_share > 0.0 {
        for s in shares.iter_mut() {
            *s /= total_share;
        }
    }

    let mut remaining = demand;
    let mut outcome = RationingOutcome::default();

    while remaining > DEMAND_TOLERANCE {
        let mut unallocated = remaining;
        let mut active_share = 0.0;

        for (j, firm) in firms.iter_mut().enumerate() {
            if shares[j] <= 0.0 {
                continue;
            }
            if stock[j] <= 0.0 {
                shares[j] = 0.0;
                continue;
            }

            let money = remaining * shares[j];
            let quantity = money / prices[j];
            let core = firm.core_mut();

            if quantity <= stock[j] {
                core.sold += quantity;
                outcome.quantity += quantity;
                unallocated -= money;
                active_share += shares[j];
                stock[j] -= quantity;
            } else {
                if outcome.rounds == 0 {
                    core.unfilled = quantity - stock[j];
                }
                core.sold += stock[j];
                outcome.quantity += stock[j];
                unallocated -= stock[j] * prices[j];
                shares[j] = 0.0;
                stock[j] = 0.0;
            }
        }

        debug!(
            target: "sector.rationing",
            sector,
            round = outcome.rounds,
            remaining,
            unallocated,
            active_share,
            "rationing round"
        );

        outcome.rounds += 1;
        remaining = unallocated.max(0.0);

        if active_share > 0.0 {
            for s in shares.iter_mut() {
                *s /= active_share;
            }
        } else {
            break;
        }
    }

    outcome.revenue = firms.iter().map(|f| f.core().sold * f.price()).sum();
    outcome.unmet_demand = if remaining > DEMAND_TOLERANCE {
        remaining
    } else {
        0.0
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{ConsumptionFirm, FirmCore, FirmId};

    fn market(specs: &[(f64, f64, f64)]) -> Vec<ConsumptionFirm> {
        specs
            .iter()
            .enumerate()
            .map(|(i, &(share, supply, price))| {
                let mut core = FirmCore::new(FirmId(i as u64), 0, share, price, 10.0, 10.0, 1.0, 0.1);
                core.supply = supply;
                ConsumptionFirm::new(core, 4)
            })
            .collect()
    }

    #[test]
    fn exhausted_firm_residual_goes_to_the_rest() {
        let mut firms = market(&[(0.5, 100.0, 1.0), (0.3, 50.0, 1.0), (0.2, 10.0, 1.0)]);
        let out = ration_demand("consumption", &mut firms, 90.0).unwrap();

        assert!((firms[0].core.sold - 50.0).abs() < 1e-9);
        assert!((firms[1].core.sold - 30.0).abs() < 1e-9);
        assert!((firms[2].core.sold - 10.0).abs() < 1e-9);
        assert!((firms[2].core.unfilled - 8.0).abs() < 1e-9);
        assert_eq!(firms[0].core.unfilled, 0.0);
        assert_eq!(out.rounds, 2);
        assert_eq!(out.unmet_demand, 0.0);
        assert!((out.revenue - 90.0).abs() < 1e-9);
    }

    #[test]
    fn excess_demand_is_lost() {
        let mut firms = market(&[(0.5, 10.0, 2.0), (0.5, 10.0, 1.0)]);
        let out = ration_demand("consumption", &mut firms, 100.0).unwrap();
        assert_eq!(firms[0].core.sold, 10.0);
        assert_eq!(firms[1].core.sold, 10.0);
        assert!((out.unmet_demand - 70.0).abs() < 1e-9);
        assert_eq!(out.rounds, 1);
    }

    #[test]
    fn zero_demand_touches_nothing() {
        let mut firms = market(&[(0.6, 10.0, 1.0), (0.4, 10.0, 1.0)]);
        firms[0].core.sold = 3.0;
        let out = ration_demand("consumption", &mut firms, 0.0).unwrap();
        assert_eq!(out.rounds, 0);
        assert!(firms.iter().all(|f| f.core.sold == 0.0));
    }

    #[test]
    fn zero_share_firm_never_sells() {
        let mut firms = market(&[(0.0, 1_000.0, 1.0), (1.0, 5.0, 1.0)]);
        let out = ration_demand("consumption", &mut firms, 50.0).unwrap();
        assert_eq!(firms[0].core.sold, 0.0);
        assert_eq!(firms[1].core.sold, 5.0);
        assert!((out.unmet_demand - 45.0).abs() < 1e-9);
    }

    #[test]
    fn stockless_firm_drops_out_without_unfilled_record() {
        let mut firms = market(&[(0.5, 0.0, 1.0), (0.5, 100.0, 1.0)]);
        ration_demand("consumption", &mut firms, 40.0).unwrap();
        assert_eq!(firms[0].core.unfilled, 0.0);
        assert!((firms[1].core.sold - 40.0).abs() < 1e-9);
    }

    #[test]
    fn later_round_shortfall_is_not_recorded() {
        // Firm 1 can cover its first-round allocation (20) but not the
        // second-round residual routed to it after firm 0 sells out.
        let mut firms = market(&[(0.8, 10.0, 1.0), (0.2, 25.0, 1.0)]);
        let out = ration_demand("consumption", &mut firms, 100.0).unwrap();
        assert!((firms[0].core.unfilled - 70.0).abs() < 1e-9);
        assert_eq!(firms[1].core.unfilled, 0.0);
        assert_eq!(firms[1].core.sold, 25.0);
        assert!((out.unmet_demand - 65.0).abs() < 1e-9);
    }

    #[test]
    fn negative_inputs_are_rejected() {
        let mut firms = market(&[(1.0, 10.0, 1.0)]);
        assert!(matches!(
            ration_demand("consumption", &mut firms, -1.0),
            Err(SectorError::NegativeDemand { .. })
        ));

        firms[0].core.supply = -1.0;
        assert!(matches!(
            ration_demand("consumption", &mut firms, 1.0),
            Err(SectorError::NegativeSupply { .. })
        ));
    }

    #[test]
    fn priced_at_zero_with_market_share_is_rejected() {
        let mut firms = market(&[(0.5, 10.0, 1.0), (0.5, 10.0, 0.0)]);
        assert!(matches!(
            ration_demand("consumption", &mut firms, 5.0),
            Err(SectorError::NonPositivePrice { id: FirmId(1), .. })
        ));

        // Without a share the price is never used.
        firms[1].core.share = 0.0;
        let out = ration_demand("consumption", &mut firms, 5.0).unwrap();
        assert!((firms[0].core.sold - 5.0).abs() < 1e-9);
        assert_eq!(out.rounds, 1);
    }
}
