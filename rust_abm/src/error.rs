use thiserror::Error;

use crate::agents::FirmId;

/// Precondition violations raised by the sector engine.
///
/// These indicate a caller or ordering bug, not an economic outcome:
/// degenerate shares, extinction risk and unmet demand are all handled
/// inside the engine and never surface here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SectorError {
    #[error("sector `{sector}` has no live firms")]
    EmptySector { sector: String },

    #[error("sector `{sector}` received negative demand {demand}")]
    NegativeDemand { sector: String, demand: f64 },

    #[error("firm {id} in sector `{sector}` has negative supply {supply}")]
    NegativeSupply {
        sector: String,
        id: FirmId,
        supply: f64,
    },

    #[error("firm {id} in sector `{sector}` has non-positive price {price}")]
    NonPositivePrice {
        sector: String,
        id: FirmId,
        price: f64,
    },

    #[error("firm {id} is not registered in sector `{sector}`")]
    UnknownFirm { sector: String, id: FirmId },
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sector `{sector}`: {field} must be positive")]
    NonPositive { sector: String, field: &'static str },

    #[error("sector `{sector}`: {field} must lie in [0, 1], got {value}")]
    OutOfUnitRange {
        sector: String,
        field: &'static str,
        value: f64,
    },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Anything that stops a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Sector(#[from] SectorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
