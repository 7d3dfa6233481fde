use tracing::{debug, info, warn};

use super::rescale::rescale_shares;
use super::Sector;
use crate::agents::{EntrantContext, EntrantPolicy, Firm, FirmId};
use crate::error::SectorError;

/// Everything the entry/exit pass reports for one sector and period.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LifecycleOutcome {
    /// Firm count when the pass started.
    pub firms_before: usize,
    pub candidates: usize,
    pub exits: usize,
    pub bankruptcies: usize,
    /// Exits over `firms_before`.
    pub exit_rate: f64,
    /// Bankrupt exits over `firms_before`.
    pub bankruptcy_rate: f64,
    /// Equity injected to keep the sector alive.
    pub entry_cost: f64,
    /// Non-negative liquidation value returned to shareholders.
    pub exit_credit: f64,
    /// Negative net wealth of exiting firms, absorbed as a loss.
    pub bad_debt: f64,
    pub recapitalized: Option<FirmId>,
    pub entrants: Vec<FirmId>,
    /// Share sum after the final rescale.
    pub share_sum: f64,
}

/// Run one period of exit and entry on `sector`.
///
/// Insolvent firms, and incumbents whose trailing statistic is below the
/// sector's viability threshold, are exit candidates. If at least one
/// firm is not a candidate every candidate leaves; otherwise the candidate
/// with the best trailing statistic (first seen on ties) stays and is
/// recapitalised to `min_wealth`. Shares are rescaled after exits, one
/// entrant replaces each exit, and shares are rescaled again.
pub fn entry_exit<F, P>(
    sector: &mut Sector<F>,
    period: u64,
    min_wealth: f64,
    policy: &mut P,
) -> Result<LifecycleOutcome, SectorError>
where
    F: Firm,
    P: EntrantPolicy<F>,
{
    let firms_before = sector.len();
    if firms_before == 0 {
        return Err(SectorError::EmptySector {
            sector: sector.name().to_string(),
        });
    }

    let config = sector.config().clone();

    // ── 1-2. Evaluate and mark, tracking the best of the candidates ──────────
    let mut quit = vec![false; firms_before];
    let mut best: Option<(usize, f64)> = None;

    for (i, firm) in sector.firms().iter().enumerate() {
        let insolvent = firm.core().is_insolvent();
        if !insolvent && !firm.core().is_incumbent(period, config.min_tenure) {
            continue;
        }

        let trailing = firm.trailing_stat();
        if insolvent || config.exit_threshold.is_unviable(trailing) {
            quit[i] = true;
            match best {
                Some((_, stat)) if trailing <= stat => {}
                _ => best = Some((i, trailing)),
            }
        }
    }

    let candidates = quit.iter().filter(|&&q| q).count();
    let survivors = firms_before - candidates;

    // ── 3. Resolve: keep the best candidate if nobody else survives ──────────
    let mut outcome = LifecycleOutcome {
        firms_before,
        candidates,
        ..LifecycleOutcome::default()
    };

    if survivors == 0 {
        if let Some((keep, stat)) = best {
            quit[keep] = false;
            let firm = &mut sector.firms_mut()[keep];
            let id = firm.id();
            let injected = firm.core_mut().recapitalize(min_wealth);
            outcome.entry_cost += injected;
            outcome.recapitalized = Some(id);
            warn!(
                target: "sector.lifecycle",
                sector = sector.name(),
                firm = %id,
                trailing = stat,
                injected,
                "all firms failing, recapitalising best candidate"
            );
        }
    }

    // ── 4. Liquidate ─────────────────────────────────────────────────────────
    let exited = sector.registry_mut().remove_marked(&quit);
    for firm in &exited {
        let value = firm.net_wealth();
        if value < 0.0 {
            outcome.bankruptcies += 1;
            outcome.bad_debt -= value;
        } else {
            outcome.exit_credit += value;
        }
        debug!(
            target: "sector.lifecycle",
            sector = sector.name(),
            firm = %firm.id(),
            net_wealth = value,
            "firm exits"
        );
    }
    outcome.exits = exited.len();

    // ── 5. Redistribute departing shares ─────────────────────────────────────
    rescale_shares(sector.firms_mut());

    // ── 6. Spawn one entrant per exit ────────────────────────────────────────
    if outcome.exits > 0 {
        let mean_price = sector
            .firms()
            .iter()
            .map(|f| f.price() * f.share())
            .sum::<f64>();
        let ctx = EntrantContext {
            config: &config,
            mean_price: if mean_price > 0.0 {
                mean_price
            } else {
                config.initial_price
            },
            share: config.entrant_share,
        };
        for _ in 0..outcome.exits {
            let id = sector.registry_mut().next_id();
            let entrant = policy.spawn(id, period, &ctx);
            sector.registry_mut().push(entrant);
            outcome.entrants.push(id);
        }
    }

    // ── 7. Fold entrant shares in ────────────────────────────────────────────
    outcome.share_sum = rescale_shares(sector.firms_mut());

    // ── 8. Refresh the id index after membership changes ─────────────────────
    if outcome.exits > 0 {
        sector.registry_mut().rebuild_index();
    }

    outcome.exit_rate = outcome.exits as f64 / firms_before as f64;
    outcome.bankruptcy_rate = outcome.bankruptcies as f64 / firms_before as f64;

    info!(
        target: "sector.lifecycle",
        sector = sector.name(),
        period,
        candidates,
        exits = outcome.exits,
        bankruptcies = outcome.bankruptcies,
        entry_cost = outcome.entry_cost,
        "entry/exit complete"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::FirmCore;
    use crate::config::SectorConfig;

    #[derive(Clone, Debug)]
    struct ScoredFirm {
        core: FirmCore,
        stat: f64,
    }

    impl Firm for ScoredFirm {
        fn core(&self) -> &FirmCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut FirmCore {
            &mut self.core
        }

        fn trailing_stat(&self) -> f64 {
            self.stat
        }

        fn close_period(&mut self) {}
    }

    struct FixedEntrants;

    impl EntrantPolicy<ScoredFirm> for FixedEntrants {
        fn spawn(&mut self, id: FirmId, period: u64, ctx: &EntrantContext<'_>) -> ScoredFirm {
            ScoredFirm {
                core: FirmCore::new(id, period, ctx.share, ctx.mean_price, 500.0, 10.0, 1.0, 0.1),
                stat: 1.0,
            }
        }
    }

    fn config(min_tenure: u64) -> SectorConfig {
        SectorConfig {
            initial_firms: 5,
            min_tenure,
            min_wealth: 100.0,
            ..SectorConfig::capital_goods()
        }
    }

    fn sector(specs: &[(f64, f64)], min_tenure: u64) -> Sector<ScoredFirm> {
        let firms = specs
            .iter()
            .enumerate()
            .map(|(i, &(wealth, stat))| ScoredFirm {
                core: FirmCore::new(FirmId(i as u64), 0, 0.2, 1.0, wealth, 10.0, 1.0, 0.1),
                stat,
            })
            .collect();
        Sector::from_firms(config(min_tenure), firms)
    }

    #[test]
    fn all_candidates_keeps_one_recapitalised_survivor() {
        let mut s = sector(&[(50.0, 0.0); 5], 0);
        s.firms_mut()[0].core.debt = 40.0;
        let out = s.entry_exit(30, 100.0, &mut FixedEntrants).unwrap();

        assert_eq!(out.candidates, 5);
        assert_eq!(out.exits, 4);
        assert_eq!(out.recapitalized, Some(FirmId(0)));
        assert_eq!(s.len(), 5);

        let kept = s.firm(FirmId(0)).unwrap();
        assert_eq!(kept.debt(), 0.0);
        assert!(kept.net_wealth() >= 100.0);
        assert!((out.entry_cost - (100.0 + 40.0 - 50.0)).abs() < 1e-9);
        assert!((out.exit_rate - 0.8).abs() < 1e-12);
    }

    #[test]
    fn best_candidate_is_first_seen_on_ties() {
        let specs = [(-1.0, 1.0), (-1.0, 3.0), (-1.0, 3.0), (-1.0, 2.0), (-1.0, 0.0)];
        let mut s = sector(&specs, 0);
        let out = s.entry_exit(30, 100.0, &mut FixedEntrants).unwrap();

        assert_eq!(out.recapitalized, Some(FirmId(1)));
        assert_eq!(out.bankruptcies, 4);
        assert!((out.bankruptcy_rate - 0.8).abs() < 1e-12);
        assert!((out.bad_debt - 4.0).abs() < 1e-12);
        assert_eq!(s.firms()[0].id(), FirmId(1));
    }

    #[test]
    fn candidates_exit_when_others_survive() {
        let specs = [(50.0, 5.0), (50.0, 0.0), (50.0, 5.0), (-20.0, 7.0), (50.0, 5.0)];
        let mut s = sector(&specs, 0);
        let out = s.entry_exit(30, 100.0, &mut FixedEntrants).unwrap();

        assert_eq!(out.exits, 2);
        assert_eq!(out.recapitalized, None);
        assert_eq!(out.entry_cost, 0.0);
        assert_eq!(out.entrants.len(), 2);
        assert_eq!(s.len(), 5);
        assert!(s.firm(FirmId(1)).is_none());
        assert!(s.firm(FirmId(3)).is_none());
        for id in &out.entrants {
            let entrant = s.firm(*id).unwrap();
            assert_eq!(entrant.core.entered, 30);
            // 0.05 each on top of three survivors rescaled to 1/3
            assert!((entrant.share() - 0.05 / 1.1).abs() < 1e-12);
        }
        assert!((out.exit_credit - 50.0).abs() < 1e-12);
        assert!((out.bad_debt - 20.0).abs() < 1e-12);

        let total: f64 = s.firms().iter().map(|f| f.share()).sum();
        assert!((total - 1.0).abs() < 1e-3);
        assert!((out.share_sum - total).abs() < 1e-12);
    }

    #[test]
    fn young_solvent_firms_are_not_evaluated() {
        let specs = [(50.0, 0.0), (-5.0, 9.0), (50.0, 4.0)];
        let mut s = sector(&specs, 10);
        let out = s.entry_exit(3, 100.0, &mut FixedEntrants).unwrap();

        assert_eq!(out.candidates, 1);
        assert!(s.firm(FirmId(0)).is_some());
        assert!(s.firm(FirmId(1)).is_none());
    }

    #[test]
    fn nothing_to_do_keeps_population_and_shares() {
        let mut s = sector(&[(50.0, 2.0); 3], 0);
        let before: Vec<f64> = s.firms().iter().map(|f| f.share()).collect();
        let out = s.entry_exit(30, 100.0, &mut FixedEntrants).unwrap();

        assert_eq!(out.exits, 0);
        assert!(out.entrants.is_empty());
        let after: Vec<f64> = s.firms().iter().map(|f| f.share()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn empty_sector_is_a_precondition_violation() {
        let mut s = sector(&[], 0);
        assert!(matches!(
            s.entry_exit(1, 100.0, &mut FixedEntrants),
            Err(SectorError::EmptySector { .. })
        ));
    }
}
