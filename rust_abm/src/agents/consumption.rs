use super::firm::{Firm, FirmCore, History};

/// Consumption-goods producer.
///
/// Holds unsold output as inventory; viability is judged on its average
/// market share over the participation window.
#[derive(Clone, Debug)]
pub struct ConsumptionFirm {
    pub core: FirmCore,
    pub inventory: f64,
    share_history: History,
}

impl ConsumptionFirm {
    pub fn new(core: FirmCore, window: usize) -> Self {
        ConsumptionFirm {
            core,
            inventory: 0.0,
            share_history: History::new(window),
        }
    }

    /// Available supply is this period's output plus last period's stock.
    pub fn stock_up(&mut self) {
        self.core.supply = self.core.output + self.inventory;
    }

    pub fn settle_inventory(&mut self) {
        self.inventory = (self.core.supply - self.core.sold).max(0.0);
    }

    /// Price and delivery competitiveness relative to sector means.
    pub fn competitiveness(&self, mean_price: f64, mean_unfilled: f64, unfilled_weight: f64) -> f64 {
        let price_term = mean_price / self.core.price.max(1e-9);
        let delivery_term = if mean_unfilled > 0.0 {
            unfilled_weight * self.core.unfilled / mean_unfilled
        } else {
            0.0
        };
        (price_term - delivery_term).max(0.0)
    }
}

impl Firm for ConsumptionFirm {
    fn core(&self) -> &FirmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FirmCore {
        &mut self.core
    }

    fn trailing_stat(&self) -> f64 {
        self.share_history.mean()
    }

    fn close_period(&mut self) {
        self.share_history.push(self.core.share);
    }
}
