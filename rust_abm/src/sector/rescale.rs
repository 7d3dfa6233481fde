use tracing::{debug, warn};

use crate::agents::Firm;

/// Share sums within this distance of 1 are left untouched.
pub const SHARE_TOLERANCE: f64 = 1e-3;

/// Normalise a raw share vector in place so it sums to 1.
///
/// Vectors already summing to 1 within [`SHARE_TOLERANCE`] are left
/// alone. An all-zero vector falls back to equal shares. Returns the
/// resulting sum (nominally 1; 0 only for an empty vector).
pub fn normalize_shares(shares: &mut [f64]) -> f64 {
    let total: f64 = shares.iter().sum();

    if (total - 1.0).abs() < SHARE_TOLERANCE {
        return total;
    }
    if shares.is_empty() {
        return 0.0;
    }

    if total > 0.0 {
        debug!(target: "sector.rescale", total, firms = shares.len(), "rescaling shares");
        for s in shares.iter_mut() {
            *s /= total;
        }
    } else {
        warn!(target: "sector.rescale", firms = shares.len(), "zero share mass, using equal shares");
        let fair = 1.0 / shares.len() as f64;
        shares.fill(fair);
    }
    shares.iter().sum()
}

/// Rescale the market shares of a firm population to sum to 1.
pub fn rescale_shares<F: Firm>(firms: &mut [F]) -> f64 {
    let mut shares: Vec<f64> = firms.iter().map(|f| f.share()).collect();
    let total = normalize_shares(&mut shares);
    for (firm, share) in firms.iter_mut().zip(shares) {
        firm.set_share(share);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn near_unit_sum_is_untouched() {
        let mut v = vec![0.5, 0.3, 0.2004];
        let total = normalize_shares(&mut v);
        assert_eq!(v, vec![0.5, 0.3, 0.2004]);
        assert!((total - 1.0004).abs() < 1e-12);
    }

    #[test]
    fn positive_mass_is_divided_through() {
        let mut v = vec![2.0, 1.0, 1.0];
        let total = normalize_shares(&mut v);
        assert_eq!(v, vec![0.5, 0.25, 0.25]);
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_mass_falls_back_to_equal_shares() {
        let mut v = vec![0.0; 4];
        normalize_shares(&mut v);
        assert_eq!(v, vec![0.25; 4]);
    }

    #[test]
    fn empty_vector_reports_zero() {
        let mut v: Vec<f64> = Vec::new();
        assert_eq!(normalize_shares(&mut v), 0.0);
    }
}
