use crate::agents::Firm;

/// Σ value·weight over pairs.
pub fn weighted_sum<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    pairs.into_iter().map(|(value, weight)| value * weight).sum()
}

/// Share-weighted average price. Assumes shares are already normalised.
pub fn price_index<F: Firm>(firms: &[F]) -> f64 {
    weighted_sum(firms.iter().map(|f| (f.price(), f.share())))
}

/// Tenure-weighted average of `value` over incumbents.
///
/// Each incumbent weighs its tenure, at least 1 and at most `max_weight`
/// periods; entrants weigh nothing. Returns `fallback` when the sector has
/// no incumbents.
pub fn incumbent_average<F, V>(
    firms: &[F],
    period: u64,
    min_tenure: u64,
    max_weight: u64,
    fallback: f64,
    value: V,
) -> f64
where
    F: Firm,
    V: Fn(&F) -> f64,
{
    let weighted = firms
        .iter()
        .filter(|f| f.core().is_incumbent(period, min_tenure))
        .map(|f| {
            let weight = f.core().tenure(period).clamp(1, max_weight.max(1));
            (value(f), weight as f64)
        });
    let (sum, weights) = weighted.fold((0.0, 0.0), |(sum, weights), (v, w)| {
        (sum + v * w, weights + w)
    });
    if weights > 0.0 {
        sum / weights
    } else {
        fallback
    }
}

/// Minimum viable wealth in current prices.
pub fn min_viable_wealth(base: f64, price_index: f64, base_price_index: f64) -> f64 {
    if base_price_index > 0.0 {
        base * price_index / base_price_index
    } else {
        base
    }
}

/// Period-on-period rate of change; 0 without a valid previous value.
pub fn inflation(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        current / previous - 1.0
    } else {
        0.0
    }
}

/// Balance-sheet totals over a sector's live firms.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectorTotals {
    pub firms: usize,
    pub net_wealth: f64,
    pub debt: f64,
    pub equity: f64,
}

pub fn sector_totals<F: Firm>(firms: &[F]) -> SectorTotals {
    firms.iter().fold(
        SectorTotals {
            firms: firms.len(),
            ..SectorTotals::default()
        },
        |mut t, f| {
            let core = f.core();
            t.net_wealth += core.net_wealth;
            t.debt += core.debt;
            t.equity += core.equity;
            t
        },
    )
}
