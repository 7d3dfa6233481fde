use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, LogNormal};

use super::capital::CapitalFirm;
use super::consumption::ConsumptionFirm;
use super::firm::{FirmCore, FirmId};
use crate::config::SectorConfig;

/// Sector conditions an entrant is initialised against.
#[derive(Clone, Debug)]
pub struct EntrantContext<'a> {
    pub config: &'a SectorConfig,
    /// Share-weighted mean price of the incumbents (or the configured
    /// initial price when the sector is being populated).
    pub mean_price: f64,
    /// Share the entrant brings into the market before rescaling.
    pub share: f64,
}

impl<'a> EntrantContext<'a> {
    /// Context used when the sector is first populated.
    pub fn initial(config: &'a SectorConfig) -> Self {
        EntrantContext {
            config,
            mean_price: config.initial_price,
            share: config.entrant_share,
        }
    }
}

/// Entrant-generation policy: builds a fresh firm for a vacancy.
pub trait EntrantPolicy<F> {
    fn spawn(&mut self, id: FirmId, period: u64, ctx: &EntrantContext<'_>) -> F;
}

/// Draws entrant wealth and capacity from seeded distributions.
#[derive(Clone, Debug)]
pub struct RandomEntrants {
    rng: StdRng,
    wealth_dispersion: f64,
}

impl RandomEntrants {
    pub fn new(seed: u64) -> Self {
        RandomEntrants {
            rng: StdRng::seed_from_u64(seed),
            wealth_dispersion: 0.3,
        }
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    fn draw_core(&mut self, id: FirmId, period: u64, ctx: &EntrantContext<'_>) -> FirmCore {
        let cfg = ctx.config;
        let base_wealth = cfg.initial_wealth.max(1.0);
        let wealth = LogNormal::new(base_wealth.ln(), self.wealth_dispersion)
            .map(|d| d.sample(&mut self.rng))
            .unwrap_or(base_wealth);
        let capacity = cfg.initial_capacity * self.rng.gen_range(0.5..=1.0);

        FirmCore::new(
            id,
            period,
            ctx.share,
            ctx.mean_price,
            wealth,
            capacity,
            cfg.productivity,
            cfg.markup,
        )
    }
}

impl EntrantPolicy<CapitalFirm> for RandomEntrants {
    fn spawn(&mut self, id: FirmId, period: u64, ctx: &EntrantContext<'_>) -> CapitalFirm {
        let core = self.draw_core(id, period, ctx);
        CapitalFirm::new(core, ctx.config.participation_window)
    }
}

impl EntrantPolicy<ConsumptionFirm> for RandomEntrants {
    fn spawn(&mut self, id: FirmId, period: u64, ctx: &EntrantContext<'_>) -> ConsumptionFirm {
        let core = self.draw_core(id, period, ctx);
        ConsumptionFirm::new(core, ctx.config.participation_window)
    }
}
