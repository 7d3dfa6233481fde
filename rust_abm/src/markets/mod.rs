pub mod aggregates;
pub mod goods;
pub mod labor;

pub use aggregates::{
    incumbent_average, inflation, min_viable_wealth, price_index, sector_totals, weighted_sum,
    SectorTotals,
};
pub use goods::{clear_goods_markets, GoodsOutcome, MarketAgent};
pub use labor::{allocate_labor, LaborAllocation, LaborDemand};
