pub mod capital;
pub mod consumption;
pub mod entrant;
pub mod firm;

pub use capital::CapitalFirm;
pub use consumption::ConsumptionFirm;
pub use entrant::{EntrantContext, EntrantPolicy, RandomEntrants};
pub use firm::{Firm, FirmCore, FirmId};
