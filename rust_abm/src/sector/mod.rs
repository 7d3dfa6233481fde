//! Generic sector engine shared by the capital-goods and consumption-goods
//! populations.

pub mod lifecycle;
pub mod rationing;
pub mod registry;
pub mod rescale;

pub use lifecycle::{entry_exit, LifecycleOutcome};
pub use rationing::{ration_demand, RationingOutcome, DEMAND_TOLERANCE};
pub use registry::FirmRegistry;
pub use rescale::{normalize_shares, rescale_shares, SHARE_TOLERANCE};

use crate::agents::{EntrantContext, EntrantPolicy, Firm, FirmId};
use crate::config::SectorConfig;
use crate::error::SectorError;

/// A sector's live firm population together with its configuration.
#[derive(Clone, Debug)]
pub struct Sector<F> {
    config: SectorConfig,
    registry: FirmRegistry<F>,
}

impl<F: Firm> Sector<F> {
    /// Build a sector from an existing firm list and normalise its shares.
    pub fn from_firms(config: SectorConfig, firms: Vec<F>) -> Self {
        let mut registry = FirmRegistry::with_capacity(firms.len());
        for firm in firms {
            registry.push(firm);
        }
        let mut sector = Sector { config, registry };
        sector.rescale();
        sector
    }

    /// Populate the sector with `config.initial_firms` firms drawn from `policy`.
    pub fn populate<P: EntrantPolicy<F>>(config: SectorConfig, policy: &mut P) -> Self {
        let n = config.initial_firms;
        let mut registry = FirmRegistry::with_capacity(n);
        {
            let ctx = EntrantContext::initial(&config);
            for _ in 0..n {
                let id = registry.next_id();
                registry.push(policy.spawn(id, 0, &ctx));
            }
        }
        let mut sector = Sector { config, registry };
        sector.rescale();
        sector
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SectorConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn firms(&self) -> &[F] {
        self.registry.as_slice()
    }

    pub fn firms_mut(&mut self) -> &mut [F] {
        self.registry.as_mut_slice()
    }

    pub(crate) fn registry_mut(&mut self) -> &mut FirmRegistry<F> {
        &mut self.registry
    }

    pub fn firm(&self, id: FirmId) -> Option<&F> {
        self.registry.get(id)
    }

    pub fn firm_mut(&mut self, id: FirmId) -> Option<&mut F> {
        self.registry.get_mut(id)
    }

    /// Look a firm up by id, treating a miss as a caller bug.
    pub fn require_firm(&self, id: FirmId) -> Result<&F, SectorError> {
        self.firm(id).ok_or_else(|| SectorError::UnknownFirm {
            sector: self.config.name.clone(),
            id,
        })
    }

    pub fn rescale(&mut self) -> f64 {
        rescale_shares(self.registry.as_mut_slice())
    }

    pub fn ration(&mut self, demand: f64) -> Result<RationingOutcome, SectorError> {
        let name = self.config.name.clone();
        ration_demand(&name, self.registry.as_mut_slice(), demand)
    }

    pub fn entry_exit<P: EntrantPolicy<F>>(
        &mut self,
        period: u64,
        min_wealth: f64,
        policy: &mut P,
    ) -> Result<LifecycleOutcome, SectorError> {
        entry_exit(self, period, min_wealth, policy)
    }

    /// Share-weighted price index; rescales shares first so the weights are
    /// consistent.
    pub fn price_index(&mut self) -> f64 {
        self.rescale();
        crate::markets::price_index(self.firms())
    }

    /// Push every firm's performance for the period into its history.
    pub fn close_period(&mut self) {
        for firm in self.registry.iter_mut() {
            firm.close_period();
        }
    }
}
