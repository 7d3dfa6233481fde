use std::fmt;

use krabmaga::engine::{agent::Agent, state::State};
use tracing::error;

use crate::agents::{CapitalFirm, ConsumptionFirm, Firm};
use crate::error::SectorError;
use crate::sector::{RationingOutcome, Sector};
use crate::state::EconomyState;

/// Outcome of clearing both goods markets for one period.
#[derive(Clone, Debug, Default)]
pub struct GoodsOutcome {
    pub capital_demand: f64,
    pub consumption_demand: f64,
    pub capital: RationingOutcome,
    pub consumption: RationingOutcome,
}

/// Clear the capital-goods and consumption-goods markets in-place.
///
/// 1. Ration each sector's nominal demand across its firms.
/// 2. Book sales against wage bills; adapt markups and expectations.
/// 3. Update market shares from this period's performance and rescale.
/// 4. Close the period in every firm's rolling history.
pub fn clear_goods_markets(state: &mut EconomyState) -> Result<(), SectorError> {
    let capital_demand = state.capital_demand;
    let consumption_demand = state.consumption_demand;

    let capital = state.capital.ration(capital_demand)?;
    let consumption = state.consumption.ration(consumption_demand)?;

    let wage = state.config.wage;
    let speed = state.config.markup_adjustment_speed;
    let rd_bill = wage * state.labor_last.rd;

    // ── Capital goods: sales, R&D wages, share update ────────────────────────
    for firm in state.capital.firms_mut() {
        let rd_cost = rd_bill * firm.share();
        let core = firm.core_mut();
        core.book_sales(wage);
        core.net_wealth -= rd_cost;
        core.adapt_markup(speed);
        core.update_expectations();
    }
    update_capital_shares(&mut state.capital, state.config.capital_share_smoothing);

    // ── Consumption goods: sales, inventories, competitiveness ───────────────
    for firm in state.consumption.firms_mut() {
        let core = firm.core_mut();
        core.book_sales(wage);
        core.adapt_markup(speed);
        core.update_expectations();
        firm.settle_inventory();
    }
    update_consumption_shares(
        &mut state.consumption,
        state.config.share_dynamics,
        state.config.unfilled_weight,
    );

    state.capital.close_period();
    state.consumption.close_period();

    state.capital_sales_last = capital.revenue;
    state.consumption_sales_last = consumption.revenue;
    state.goods_last = GoodsOutcome {
        capital_demand,
        consumption_demand,
        capital,
        consumption,
    };
    Ok(())
}

/// Blend each capital-goods firm's share with its share of sector revenue.
fn update_capital_shares(sector: &mut Sector<CapitalFirm>, smoothing: f64) {
    let revenue: f64 = sector
        .firms()
        .iter()
        .map(|f| f.core.sold * f.core.price)
        .sum();
    if revenue <= 0.0 {
        return;
    }
    for firm in sector.firms_mut() {
        let realized = firm.core.sold * firm.core.price / revenue;
        let share = smoothing * firm.share() + (1.0 - smoothing) * realized;
        firm.set_share(share);
    }
    sector.rescale();
}

/// Replicator dynamics: firms more competitive than the share-weighted
/// sector mean gain share, the rest lose it.
fn update_consumption_shares(sector: &mut Sector<ConsumptionFirm>, intensity: f64, unfilled_weight: f64) {
    let n = sector.len();
    if n == 0 {
        return;
    }
    let mean_price = crate::markets::price_index(sector.firms());
    let mean_unfilled = sector
        .firms()
        .iter()
        .map(|f| f.core.unfilled)
        .sum::<f64>()
        / n as f64;

    let competitiveness: Vec<f64> = sector
        .firms()
        .iter()
        .map(|f| f.competitiveness(mean_price, mean_unfilled, unfilled_weight))
        .collect();
    let mean: f64 = sector
        .firms()
        .iter()
        .zip(&competitiveness)
        .map(|(f, e)| f.share() * e)
        .sum();
    if mean <= 0.0 {
        return;
    }

    for (firm, e) in sector.firms_mut().iter_mut().zip(&competitiveness) {
        let share = firm.share() * (1.0 + intensity * (e / mean - 1.0));
        firm.set_share(share.max(0.0));
    }
    sector.rescale();
}

// ─────────────────────────────────────────────────────────────────────────────
// krabmaga Agent proxy for the goods markets
// ─────────────────────────────────────────────────────────────────────────────

/// Proxy agent that clears both goods markets within the krabmaga schedule.
///
/// Production runs before it in `before_step`; entry and exit run after
/// it in `after_step`.
#[derive(Clone)]
pub struct MarketAgent;

impl fmt::Display for MarketAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarketAgent")
    }
}

impl Agent for MarketAgent {
    fn step(&mut self, state: &mut dyn State) {
        let state = state
            .as_any_mut()
            .downcast_mut::<EconomyState>()
            .expect("state should be EconomyState");
        if state.fault.is_some() {
            return;
        }
        if let Err(err) = clear_goods_markets(state) {
            error!(target: "economy.step", %err, "goods market clearing failed");
            state.fault = Some(err);
        }
    }
}
