/*!
# `ks_sector_engine`: market clearing and firm entry/exit for K+S sectors

Generic engine for the capital-goods and consumption-goods sectors of a
Keynes+Schumpeter style agent-based macro model. One engine, parameterised
by [`SectorConfig`], runs both firm populations:

- [`sector::ration_demand`] allocates nominal demand across firms in
  proportion to market share, respecting finite supply;
- [`sector::rescale_shares`] keeps shares summing to 1;
- [`sector::entry_exit`] removes failing firms, keeps at least one firm
  alive and replaces exits with entrants.

A [krABMaga](https://github.com/krABMaga/krABMaga) harness ([`EconomyState`])
drives both sectors through a fixed per-period order. Python bindings are
available with the `python` feature.

## Quick start

```no_run
use ks_sector_engine::{run_simulation, Config};

let records = run_simulation(Config::default(), 50, 42)?;
for r in &records {
    println!("{} {:.3} {:.3}", r.period, r.cpi, r.consumption_exit_rate);
}
# Ok::<(), ks_sector_engine::SimulationError>(())
```
*/

pub mod agents;
pub mod config;
pub mod error;
pub mod markets;
pub mod sector;
pub mod state;

#[cfg(feature = "python")]
mod python;

use krabmaga::engine::schedule::Schedule;
use krabmaga::engine::state::State;
use tracing::info;

pub use agents::{CapitalFirm, ConsumptionFirm, Firm, FirmCore, FirmId};
pub use config::{Config, ExitThreshold, SectorConfig};
pub use error::{ConfigError, SectorError, SimulationError};
pub use sector::Sector;
pub use state::{EconomyState, PeriodRecord};

/// Run a two-sector simulation and return per-period aggregate records.
///
/// Stops at the first precondition violation raised by the sector engine.
pub fn run_simulation(
    config: Config,
    periods: usize,
    seed: u64,
) -> Result<Vec<PeriodRecord>, SimulationError> {
    let mut state = EconomyState::new(config, seed)?;
    let mut schedule = Schedule::new();

    // Initialise agent schedule (calls EconomyState::init)
    state.init(&mut schedule);

    for _ in 0..periods {
        schedule.step(&mut state);
        if let Some(err) = state.fault.take() {
            return Err(err.into());
        }
    }

    info!(
        target: "economy.step",
        periods = state.records.len(),
        capital_firms = state.capital.len(),
        consumption_firms = state.consumption.len(),
        "simulation finished"
    );
    Ok(state.records)
}
