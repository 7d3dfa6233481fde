use super::firm::{Firm, FirmCore, History};

/// Capital-goods producer.
///
/// Viability is judged on how many clients (consumption-goods firms
/// ordering machines) it served over the participation window.
#[derive(Clone, Debug)]
pub struct CapitalFirm {
    pub core: FirmCore,
    pub clients: u32,
    client_history: History,
}

impl CapitalFirm {
    pub fn new(core: FirmCore, window: usize) -> Self {
        CapitalFirm {
            core,
            clients: 0,
            client_history: History::new(window),
        }
    }

    pub fn add_client(&mut self) {
        self.clients += 1;
    }

    /// Made-to-order: everything produced this period is available.
    pub fn stock_up(&mut self) {
        self.core.supply = self.core.output;
    }
}

impl Firm for CapitalFirm {
    fn core(&self) -> &FirmCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut FirmCore {
        &mut self.core
    }

    fn trailing_stat(&self) -> f64 {
        self.client_history.sum()
    }

    fn close_period(&mut self) {
        self.client_history.push(f64::from(self.clients));
        self.clients = 0;
    }
}
