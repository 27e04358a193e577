//! Translates per-variable and per-group bound descriptions into the flat
//! lower/upper arrays Ipopt expects.

use crate::adapter::constraint::{Constraint, ConstraintKind};
use crate::error::{Error, Result};

/// Stand-in for an unbounded value. Ipopt has no native infinity; anything at
/// or beyond its `nlp_lower_bound_inf` / `nlp_upper_bound_inf` options
/// (default 1e19) is treated as unbounded.
pub const SENTINEL_BOUND: f64 = 1.0e19;

/// Flatten optional `(lower, upper)` pairs into two arrays of length `n`.
/// `None` means every variable is unbounded.
pub fn variable_bounds(bounds: Option<&[(f64, f64)]>, n: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    match bounds {
        None => Ok((vec![-SENTINEL_BOUND; n], vec![SENTINEL_BOUND; n])),
        Some(pairs) => {
            if pairs.len() != n {
                return Err(Error::Config(format!(
                    "expected {} variable bound pairs, got {}",
                    n,
                    pairs.len()
                )));
            }
            let lower = pairs.iter().map(|b| b.0).collect();
            let upper = pairs.iter().map(|b| b.1).collect();
            Ok((lower, upper))
        }
    }
}

/// Emit the stacked constraint bound arrays from each group's kind and
/// discovered dimension: `[0, 0]` per equality row, `[0, SENTINEL_BOUND)` per
/// inequality row.
pub fn constraint_bounds(constraints: &[Constraint], dims: &[usize]) -> (Vec<f64>, Vec<f64>) {
    let m: usize = dims.iter().sum();
    let lower = vec![0.0; m];
    let mut upper = Vec::with_capacity(m);
    for (con, &dim) in constraints.iter().zip(dims) {
        let hi = match con.kind() {
            ConstraintKind::Equality => 0.0,
            ConstraintKind::Inequality => SENTINEL_BOUND,
        };
        upper.extend(std::iter::repeat(hi).take(dim));
    }
    (lower, upper)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    #[test]
    fn unbounded_variables_use_the_sentinel() {
        let (lo, hi) = variable_bounds(None, 3).unwrap();
        assert_eq!(lo, vec![-SENTINEL_BOUND; 3]);
        assert_eq!(hi, vec![SENTINEL_BOUND; 3]);
    }

    #[test]
    fn explicit_pairs_are_split_into_flat_arrays() {
        let (lo, hi) = variable_bounds(Some(&[(0.0, 1.0), (-2.0, 2.0)]), 2).unwrap();
        assert_eq!(lo, vec![0.0, -2.0]);
        assert_eq!(hi, vec![1.0, 2.0]);
    }

    #[test]
    fn wrong_pair_count_is_a_configuration_error() {
        let err = variable_bounds(Some(&[(0.0, 1.0)]), 2).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn constraint_bounds_follow_kind_and_dimension() {
        let cons = vec![
            Constraint::equality(|x| Array1::from(vec![x[0]])),
            Constraint::inequality(|x| Array1::from(vec![x[0], x[1]])),
        ];
        let (lo, hi) = constraint_bounds(&cons, &[1, 2]);
        assert_eq!(lo, vec![0.0, 0.0, 0.0]);
        assert_eq!(hi, vec![0.0, SENTINEL_BOUND, SENTINEL_BOUND]);
    }

    #[test]
    fn no_constraints_yields_empty_bound_arrays() {
        let (lo, hi) = constraint_bounds(&[], &[]);
        assert!(lo.is_empty());
        assert!(hi.is_empty());
    }
}
