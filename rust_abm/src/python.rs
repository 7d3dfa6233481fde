use std::collections::HashMap;

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::Config;
use crate::error::SimulationError;
use crate::state::PeriodRecord;

// ─────────────────────────────────────────────────────────────────────────────
// Python-visible period record
// ─────────────────────────────────────────────────────────────────────────────

/// Aggregate statistics for a single simulation period.
///
/// All fields are read-only from Python.
#[pyclass(get_all)]
#[derive(Clone, Debug)]
pub struct PyPeriodRecord {
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
}

impl From<PeriodRecord> for PyPeriodRecord {
    fn from(r: PeriodRecord) -> Self {
        PyPeriodRecord {
            period: r.period,
            ppi: r.ppi,
            cpi: r.cpi,
            inflation: r.inflation,
            employment: r.employment,
            capital_firms: r.capital_firms,
            consumption_firms: r.consumption_firms,
            capital_sales: r.capital_sales,
            consumption_sales: r.consumption_sales,
            capital_unmet_demand: r.capital_unmet_demand,
            consumption_unmet_demand: r.consumption_unmet_demand,
            capital_exit_rate: r.capital_exit_rate,
            consumption_exit_rate: r.consumption_exit_rate,
            capital_bankruptcy_rate: r.capital_bankruptcy_rate,
            consumption_bankruptcy_rate: r.consumption_bankruptcy_rate,
            entry_cost: r.entry_cost,
            exit_credit: r.exit_credit,
            bad_debt: r.bad_debt,
            average_unfilled: r.average_unfilled,
            average_price: r.average_price,
            capital_net_wealth: r.capital_net_wealth,
            consumption_net_wealth: r.consumption_net_wealth,
            capital_equity: r.capital_equity,
            consumption_equity: r.consumption_equity,
        }
    }
}

#[pymethods]
impl PyPeriodRecord {
    fn __repr__(&self) -> String {
        format!(
            "PyPeriodRecord(period={}, cpi={:.4}, ppi={:.4}, consumption_exit_rate={:.4})",
            self.period, self.cpi, self.ppi, self.consumption_exit_rate
        )
    }

    /// Convert to a plain Python dict for easy interop with pandas / polars.
    fn to_dict(&self) -> HashMap<String, f64> {
        let mut m = HashMap::new();
        m.insert("period".to_string(), self.period as f64);
        m.insert("ppi".to_string(), self.ppi);
        m.insert("cpi".to_string(), self.cpi);
        m.insert("inflation".to_string(), self.inflation);
        m.insert("employment".to_string(), self.employment);
        m.insert("capital_firms".to_string(), self.capital_firms as f64);
        m.insert("consumption_firms".to_string(), self.consumption_firms as f64);
        m.insert("capital_sales".to_string(), self.capital_sales);
        m.insert("consumption_sales".to_string(), self.consumption_sales);
        m.insert("capital_unmet_demand".to_string(), self.capital_unmet_demand);
        m.insert(
            "consumption_unmet_demand".to_string(),
            self.consumption_unmet_demand,
        );
        m.insert("capital_exit_rate".to_string(), self.capital_exit_rate);
        m.insert("consumption_exit_rate".to_string(), self.consumption_exit_rate);
        m.insert(
            "capital_bankruptcy_rate".to_string(),
            self.capital_bankruptcy_rate,
        );
        m.insert(
            "consumption_bankruptcy_rate".to_string(),
            self.consumption_bankruptcy_rate,
        );
        m.insert("entry_cost".to_string(), self.entry_cost);
        m.insert("exit_credit".to_string(), self.exit_credit);
        m.insert("bad_debt".to_string(), self.bad_debt);
        m.insert("average_unfilled".to_string(), self.average_unfilled);
        m.insert("average_price".to_string(), self.average_price);
        m.insert("capital_net_wealth".to_string(), self.capital_net_wealth);
        m.insert(
            "consumption_net_wealth".to_string(),
            self.consumption_net_wealth,
        );
        m.insert("capital_equity".to_string(), self.capital_equity);
        m.insert("consumption_equity".to_string(), self.consumption_equity);
        m
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main simulation entry point
// ─────────────────────────────────────────────────────────────────────────────

/// Run a two-sector simulation and return per-period aggregate statistics.
///
/// Args:
///     periods: Number of simulation periods to run.
///     seed: Random seed for reproducibility.
///     config_json: Optional JSON overrides for the default configuration.
///
/// Returns:
///     A list of :class:`PyPeriodRecord` objects, one per period.
#[pyfunction]
#[pyo3(name = "run_simulation", signature = (periods=50, seed=42, config_json=None))]
fn py_run_simulation(
    periods: usize,
    seed: u64,
    config_json: Option<&str>,
) -> PyResult<Vec<PyPeriodRecord>> {
    let config = match config_json {
        Some(json) => Config::from_json_str(json).map_err(|e| PyValueError::new_err(e.to_string()))?,
        None => Config::default(),
    };

    let records = crate::run_simulation(config, periods, seed).map_err(|e| match e {
        SimulationError::Config(e) => PyValueError::new_err(e.to_string()),
        SimulationError::Sector(e) => PyRuntimeError::new_err(e.to_string()),
    })?;

    Ok(records.into_iter().map(PyPeriodRecord::from).collect())
}

// ─────────────────────────────────────────────────────────────────────────────
// Module definition
// ─────────────────────────────────────────────────────────────────────────────

/// Sector engine for the K+S capital-goods and consumption-goods markets.
#[pymodule]
fn ks_sector_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyPeriodRecord>()?;
    m.add_function(wrap_pyfunction!(py_run_simulation, m)?)?;
    Ok(())
}
