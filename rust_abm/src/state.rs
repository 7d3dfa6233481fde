use std::any::Any;

use krabmaga::engine::{schedule::Schedule, state::State};
use rand::distributions::WeightedIndex;
use rand_distr::Distribution;
use tracing::{debug, error};

use crate::agents::{CapitalFirm, ConsumptionFirm, Firm, RandomEntrants};
use crate::config::Config;
use crate::error::{ConfigError, SectorError};
use crate::markets::{
    allocate_labor, incumbent_average, inflation, min_viable_wealth, sector_totals, GoodsOutcome,
    LaborAllocation, LaborDemand, MarketAgent,
};
use crate::sector::{LifecycleOutcome, Sector};

// ─────────────────────────────────────────────────────────────────────────────
// Period record
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate statistics recorded for a single simulation period.
#[derive(Clone, Debug, Default)]
pub struct PeriodRecord {
    pub period: u64,
    pub ppi: f64,
    pub cpi: f64,
    pub inflation: f64,
    pub employment: f64,
    pub capital_firms: usize,
    pub consumption_firms: usize,
    pub capital_sales: f64,
    pub consumption_sales: f64,
    pub capital_unmet_demand: f64,
    pub consumption_unmet_demand: f64,
    pub rationing_rounds: usize,
    pub capital_exit_rate: f64,
    pub consumption_exit_rate: f64,
    pub capital_bankruptcy_rate: f64,
    pub consumption_bankruptcy_rate: f64,
    pub entry_cost: f64,
    pub exit_credit: f64,
    pub bad_debt: f64,
    pub average_unfilled: f64,
    pub average_price: f64,
    pub capital_net_wealth: f64,
    pub consumption_net_wealth: f64,
    pub capital_equity: f64,
    pub consumption_equity: f64,
    pub capital_debt: f64,
    pub consumption_debt: f64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Economy state (implements krabmaga State)
// ─────────────────────────────────────────────────────────────────────────────

/// Central state holding both sector populations and per-period outcomes.
///
/// Per-period order, made explicit rather than left to on-demand
/// evaluation:
///   before_step → production planning, labour allocation (capital sector
///                 first), supplier choice, demand
///   MarketAgent → rationing in both goods markets, bookkeeping, shares
///   after_step  → entry/exit in both sectors, price indices, record
pub struct EconomyState {
    pub capital: Sector<CapitalFirm>,
    pub consumption: Sector<ConsumptionFirm>,
    pub entrants: RandomEntrants,

    // Demand for the period being cleared
    pub capital_demand: f64,
    pub consumption_demand: f64,

    // Market outcomes (updated each period)
    pub labor_last: LaborAllocation,
    pub goods_last: GoodsOutcome,
    pub capital_lifecycle: LifecycleOutcome,
    pub consumption_lifecycle: LifecycleOutcome,
    pub capital_sales_last: f64,
    pub consumption_sales_last: f64,

    // Price indices
    pub ppi: f64,
    pub ppi_base: f64,
    pub cpi: f64,
    pub cpi_previous: f64,

    pub config: Config,

    // First precondition violation; stops the run
    pub fault: Option<SectorError>,

    pub records: Vec<PeriodRecord>,
    pub current_period: u64,

    seed: u64,
}

impl EconomyState {
    /// Create a new economy and populate both sectors.
    pub fn new(config: Config, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut entrants = RandomEntrants::new(seed);
        let mut capital: Sector<CapitalFirm> =
            Sector::populate(config.capital.clone(), &mut entrants);
        let mut consumption: Sector<ConsumptionFirm> =
            Sector::populate(config.consumption.clone(), &mut entrants);

        let ppi = capital.price_index();
        let cpi = consumption.price_index();
        let consumption_sales_last: f64 = consumption
            .firms()
            .iter()
            .map(|f| f.core.capacity * f.core.price)
            .sum();

        Ok(EconomyState {
            capital,
            consumption,
            entrants,
            capital_demand: 0.0,
            consumption_demand: 0.0,
            labor_last: LaborAllocation::default(),
            goods_last: GoodsOutcome::default(),
            capital_lifecycle: LifecycleOutcome::default(),
            consumption_lifecycle: LifecycleOutcome::default(),
            capital_sales_last: 0.0,
            consumption_sales_last,
            ppi,
            ppi_base: ppi,
            cpi,
            cpi_previous: cpi,
            config,
            fault: None,
            records: Vec::new(),
            current_period: 0,
            seed,
        })
    }

    /// The period currently being simulated.
    pub fn period(&self) -> u64 {
        self.current_period + 1
    }

    // ─── Per-period step helpers ─────────────────────────────────────────────

    /// Production, labour and demand for the coming market round.
    pub fn run_pre_step(&mut self) {
        let wage = self.config.wage;

        // 1. Firms plan output and set prices
        for firm in self.capital.firms_mut() {
            firm.core.plan_production();
            firm.core.set_price(wage);
        }
        for firm in self.consumption.firms_mut() {
            firm.core.plan_production();
            firm.core.set_price(wage);
        }

        // 2. Labour market: capital sector served before consumption
        let capital_demand: f64 = self.capital.firms().iter().map(|f| f.core.labor_demand()).sum();
        let rd_demand = self.config.rd_ratio * self.capital_sales_last / wage.max(1e-9);
        let labor = allocate_labor(&LaborDemand {
            supply: self.config.labor_supply,
            rd_demand,
            rd_max_share: self.config.capital.rd_max_share,
            capital_demand: capital_demand + rd_demand,
            consumption_demand: self
                .consumption
                .firms()
                .iter()
                .map(|f| f.core.labor_demand())
                .sum(),
            max_shortage: self.config.capital.max_labor_shortage,
        });

        // 3. Production
        for firm in self.capital.firms_mut() {
            firm.core.produce(labor.capital_factor);
            firm.stock_up();
        }
        for firm in self.consumption.firms_mut() {
            firm.core.produce(labor.consumption_factor);
            firm.stock_up();
        }

        // 4. Consumption firms pick a machine supplier
        self.choose_suppliers();

        // 5. Nominal demand for both markets
        let employment = labor.capital + labor.consumption;
        self.consumption_demand =
            self.config.propensity_to_consume * wage * employment + self.config.autonomous_demand;
        self.capital_demand = self.config.investment_ratio * self.consumption_sales_last;
        self.labor_last = labor;

        debug!(
            target: "economy.step",
            period = self.period(),
            capital_demand = self.capital_demand,
            consumption_demand = self.consumption_demand,
            employment,
            "demand set"
        );
    }

    /// Each consumption-goods firm becomes a client of one capital-goods
    /// firm, drawn in proportion to capital-goods market share.
    fn choose_suppliers(&mut self) {
        let weights: Vec<f64> = self.capital.firms().iter().map(|f| f.share()).collect();
        let Ok(dist) = WeightedIndex::new(&weights) else {
            return;
        };
        let rng = self.entrants.rng_mut();
        let picks: Vec<usize> = (0..self.consumption.len()).map(|_| dist.sample(rng)).collect();
        let suppliers = self.capital.firms_mut();
        for pick in picks {
            suppliers[pick].add_client();
        }
    }

    /// Entry and exit in both sectors, against aggregates computed before
    /// any firm leaves.
    pub fn run_lifecycle(&mut self) -> Result<(), SectorError> {
        let period = self.period();
        self.ppi = self.capital.price_index();
        let min_wealth_capital =
            min_viable_wealth(self.config.capital.min_wealth, self.ppi, self.ppi_base);
        let min_wealth_consumption =
            min_viable_wealth(self.config.consumption.min_wealth, self.ppi, self.ppi_base);

        self.capital_lifecycle =
            self.capital
                .entry_exit(period, min_wealth_capital, &mut self.entrants)?;
        self.consumption_lifecycle =
            self.consumption
                .entry_exit(period, min_wealth_consumption, &mut self.entrants)?;
        Ok(())
    }

    /// Entry/exit, then price indices over the updated populations.
    pub fn run_post_step(&mut self) {
        if let Err(err) = self.run_lifecycle() {
            error!(target: "economy.step", %err, "entry/exit failed");
            self.fault = Some(err);
            return;
        }
        self.ppi = self.capital.price_index();
        self.cpi_previous = self.cpi;
        self.cpi = self.consumption.price_index();
    }

    /// Record aggregate statistics for the completed period.
    pub fn record(&mut self) {
        self.current_period += 1;
        let period = self.current_period;

        let capital_totals = sector_totals(self.capital.firms());
        let consumption_totals = sector_totals(self.consumption.firms());

        // Incumbent references carry over when no incumbent is left.
        let (unfilled_last, price_last) = self
            .records
            .last()
            .map_or((0.0, self.cpi), |r| (r.average_unfilled, r.average_price));
        let cfg = &self.config.consumption;
        let max_weight = cfg.participation_window as u64;
        let average_unfilled = incumbent_average(
            self.consumption.firms(),
            period,
            cfg.min_tenure,
            max_weight,
            unfilled_last,
            |f| f.core.unfilled,
        );
        let average_price = incumbent_average(
            self.consumption.firms(),
            period,
            cfg.min_tenure,
            max_weight,
            price_last,
            |f| f.core.price,
        );

        let goods = &self.goods_last;
        let cap = &self.capital_lifecycle;
        let con = &self.consumption_lifecycle;
        self.records.push(PeriodRecord {
            period,
            ppi: self.ppi,
            cpi: self.cpi,
            inflation: inflation(self.cpi, self.cpi_previous),
            employment: self.labor_last.capital + self.labor_last.consumption,
            capital_firms: capital_totals.firms,
            consumption_firms: consumption_totals.firms,
            capital_sales: goods.capital.revenue,
            consumption_sales: goods.consumption.revenue,
            capital_unmet_demand: goods.capital.unmet_demand,
            consumption_unmet_demand: goods.consumption.unmet_demand,
            rationing_rounds: goods.capital.rounds + goods.consumption.rounds,
            capital_exit_rate: cap.exit_rate,
            consumption_exit_rate: con.exit_rate,
            capital_bankruptcy_rate: cap.bankruptcy_rate,
            consumption_bankruptcy_rate: con.bankruptcy_rate,
            entry_cost: cap.entry_cost + con.entry_cost,
            exit_credit: cap.exit_credit + con.exit_credit,
            bad_debt: cap.bad_debt + con.bad_debt,
            average_unfilled,
            average_price,
            capital_net_wealth: capital_totals.net_wealth,
            consumption_net_wealth: consumption_totals.net_wealth,
            capital_equity: capital_totals.equity,
            consumption_equity: consumption_totals.equity,
            capital_debt: capital_totals.debt,
            consumption_debt: consumption_totals.debt,
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// krabmaga State implementation
// ─────────────────────────────────────────────────────────────────────────────

impl State for EconomyState {
    /// Schedule the goods-market proxy; production and entry/exit run in
    /// `before_step` / `after_step` so the period order stays fixed.
    fn init(&mut self, schedule: &mut Schedule) {
        schedule.schedule_repeating(Box::new(MarketAgent), 0.0, 0);
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_state_mut(&mut self) -> &mut dyn State {
        self
    }

    fn as_state(&self) -> &dyn State {
        self
    }

    fn reset(&mut self) {
        // Re-populate from the same seed and config
        let config = self.config.clone();
        let mut entrants = RandomEntrants::new(self.seed);
        self.capital = Sector::populate(config.capital.clone(), &mut entrants);
        self.consumption = Sector::populate(config.consumption.clone(), &mut entrants);
        self.entrants = entrants;
        self.ppi = self.capital.price_index();
        self.ppi_base = self.ppi;
        self.cpi = self.consumption.price_index();
        self.cpi_previous = self.cpi;
        self.consumption_sales_last = self
            .consumption
            .firms()
            .iter()
            .map(|f| f.core.capacity * f.core.price)
            .sum();
        self.capital_sales_last = 0.0;
        self.capital_demand = 0.0;
        self.consumption_demand = 0.0;
        self.labor_last = LaborAllocation::default();
        self.goods_last = GoodsOutcome::default();
        self.capital_lifecycle = LifecycleOutcome::default();
        self.consumption_lifecycle = LifecycleOutcome::default();
        self.fault = None;
        self.records.clear();
        self.current_period = 0;
    }

    fn before_step(&mut self, _schedule: &mut Schedule) {
        if self.fault.is_none() {
            self.run_pre_step();
        }
    }

    fn after_step(&mut self, _schedule: &mut Schedule) {
        if self.fault.is_some() {
            return;
        }
        self.run_post_step();
        if self.fault.is_none() {
            self.record();
        }
    }

    fn update(&mut self, _step: u64) {}
}
