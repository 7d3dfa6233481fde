use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers and rolling history
// ─────────────────────────────────────────────────────────────────────────────

/// Stable firm identifier, unique within a sector for the firm's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FirmId(pub u64);

impl fmt::Display for FirmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fixed-length ring buffer of per-period observations, most recent last.
#[derive(Clone, Debug)]
pub struct History {
    values: VecDeque<f64>,
    window: usize,
}

impl History {
    pub fn new(window: usize) -> Self {
        History {
            values: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.window == 0 {
            return;
        }
        if self.values.len() == self.window {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Sum over the recorded window. Periods not yet observed count as zero.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Average over the periods observed so far, at most one window.
    /// Zero before the first observation.
    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.sum() / self.values.len() as f64
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State shared by every firm variant
// ─────────────────────────────────────────────────────────────────────────────

/// Mutable state common to capital-goods and consumption-goods firms.
#[derive(Clone, Debug)]
pub struct FirmCore {
    pub id: FirmId,
    pub share: f64,
    pub price: f64,
    pub supply: f64,

    // Balance sheet
    pub net_wealth: f64,
    pub debt: f64,
    pub equity: f64,

    // Tenure
    pub entered: u64,

    // Market-clearing results for the current period
    pub sold: f64,
    pub unfilled: f64,

    // Production state
    pub productivity: f64,
    pub capacity: f64,
    pub markup: f64,
    pub expected_demand: f64,
    pub desired_output: f64,
    pub output: f64,
    pub labor: f64,
}

impl FirmCore {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: FirmId,
        entered: u64,
        share: f64,
        price: f64,
        wealth: f64,
        capacity: f64,
        productivity: f64,
        markup: f64,
    ) -> Self {
        FirmCore {
            id,
            share,
            price,
            supply: 0.0,
            net_wealth: wealth,
            debt: 0.0,
            equity: wealth,
            entered,
            sold: 0.0,
            unfilled: 0.0,
            productivity,
            capacity,
            markup,
            expected_demand: capacity,
            desired_output: capacity,
            output: 0.0,
            labor: 0.0,
        }
    }

    pub fn tenure(&self, period: u64) -> u64 {
        period.saturating_sub(self.entered)
    }

    /// Whether the firm has completed `min_tenure` periods in the market.
    pub fn is_incumbent(&self, period: u64, min_tenure: u64) -> bool {
        period >= self.entered.saturating_add(min_tenure)
    }

    pub fn is_insolvent(&self) -> bool {
        self.net_wealth < 0.0
    }

    // ─── Production sub-steps ───────────────────────────────────────────────

    pub fn plan_production(&mut self) {
        self.desired_output = self.expected_demand.clamp(0.0, self.capacity);
    }

    pub fn labor_demand(&self) -> f64 {
        self.desired_output / self.productivity.max(1e-9)
    }

    pub fn set_price(&mut self, wage: f64) {
        let unit_cost = wage / self.productivity.max(1e-9);
        self.price = (unit_cost * (1.0 + self.markup)).max(1e-9);
    }

    /// Hire the fraction of desired labour the labour market granted.
    pub fn produce(&mut self, labor_factor: f64) {
        self.labor = self.labor_demand() * labor_factor.clamp(0.0, 1.0);
        self.output = self.labor * self.productivity;
    }

    /// Book this period's sales against the wage bill; returns revenue.
    pub fn book_sales(&mut self, wage: f64) -> f64 {
        let revenue = self.sold * self.price;
        let profit = revenue - wage * self.labor;
        self.net_wealth += profit;
        revenue
    }

    // ─── Market interfaces ──────────────────────────────────────────────────

    pub fn adapt_markup(&mut self, speed: f64) {
        let served = self.sold.max(1e-9);
        if self.unfilled > 0.0 {
            self.markup += speed * (self.unfilled / served).min(1.0);
        } else {
            let unsold = (self.supply - self.sold).max(0.0);
            let excess = -(unsold / self.supply.max(1e-9));
            self.markup = (self.markup + speed * excess).max(0.01);
        }
    }

    pub fn update_expectations(&mut self) {
        self.expected_demand = self.sold + self.unfilled;
    }

    /// Zero the debt and inject enough equity to restore `min_wealth`.
    ///
    /// Returns the equity injected.
    pub fn recapitalize(&mut self, min_wealth: f64) -> f64 {
        let injection = min_wealth + self.debt - self.net_wealth;
        self.debt = 0.0;
        self.equity += injection;
        self.net_wealth += injection;
        injection
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability interface used by the sector engine
// ─────────────────────────────────────────────────────────────────────────────

/// What the sector engine needs from a firm, independent of its variant.
pub trait Firm {
    fn core(&self) -> &FirmCore;
    fn core_mut(&mut self) -> &mut FirmCore;

    /// Performance over the participation window used to rank exit candidates.
    fn trailing_stat(&self) -> f64;

    /// Push this period's performance into the rolling history.
    fn close_period(&mut self);

    fn id(&self) -> FirmId {
        self.core().id
    }

    fn share(&self) -> f64 {
        self.core().share
    }

    fn set_share(&mut self, share: f64) {
        self.core_mut().share = share;
    }

    fn price(&self) -> f64 {
        self.core().price
    }

    fn supply(&self) -> f64 {
        self.core().supply
    }

    fn net_wealth(&self) -> f64 {
        self.core().net_wealth
    }

    fn debt(&self) -> f64 {
        self.core().debt
    }

    fn equity(&self) -> f64 {
        self.core().equity
    }
}
