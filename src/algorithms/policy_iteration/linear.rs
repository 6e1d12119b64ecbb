//! Exact evaluation of a fixed policy as one linear system.
//!
//! Unknowns are the values of the `n` open positions plus one absorbing dead variable at
//! index `n`. Row `i` encodes
//!
//! ```text
//! V(i) - γ · Σ P(j) · V(j) - γ · P(dead) · V_dead = R + γ · P(hurt) · damage
//! ```
//!
//! and the last row fixes `V_dead = death`. Won successors contribute nothing.

use nalgebra::{DMatrix, DVector};

use crate::grid::Action;
use crate::model::{SliceModel, SliceTarget};

/// Pivots smaller than this, relative to the largest pivot, count as zero.
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Assembles the system of `policy` (one action per slice index).
pub(crate) fn assemble(slice: &SliceModel, policy: &[Action], gamma: f64) -> (DMatrix<f64>, DVector<f64>) {
    let n = slice.len();
    let dead = n;
    let mut a = DMatrix::<f64>::zeros(n + 1, n + 1);
    let mut b = DVector::<f64>::zeros(n + 1);

    for (i, action) in policy.iter().enumerate() {
        a[(i, i)] += 1.0;
        let Some(transition) = slice.transition(i, *action) else {
            continue;
        };
        b[i] = transition.reward;
        for term in &transition.terms {
            let weight = gamma * term.probability;
            match term.target {
                SliceTarget::Cell(j) => a[(i, j)] -= weight,
                SliceTarget::Dead => a[(i, dead)] -= weight,
                SliceTarget::Hurt => b[i] += weight * slice.damage(),
                SliceTarget::Won => {}
            }
        }
    }
    a[(dead, dead)] = 1.0;
    b[dead] = slice.death();
    (a, b)
}

/// Solves the policy's system by LU decomposition.
///
/// Returns the `n` position values, or a description of why the system is degenerate.
pub(crate) fn evaluate(slice: &SliceModel, policy: &[Action], gamma: f64) -> Result<Vec<f64>, String> {
    let (a, b) = assemble(slice, policy, gamma);
    let lu = a.lu();

    let pivots = lu.u().diagonal();
    let largest = pivots.iter().fold(0.0_f64, |m, p| m.max(p.abs()));
    if let Some((row, pivot)) = pivots
        .iter()
        .enumerate()
        .find(|(_, p)| p.abs() <= PIVOT_TOLERANCE * largest.max(1.0))
    {
        return Err(format!("pivot {} at row {} is numerically zero", pivot, row));
    }

    let x = lu
        .solve(&b)
        .ok_or_else(|| "LU solve failed".to_string())?;
    if let Some(bad) = x.iter().find(|v| !v.is_finite()) {
        return Err(format!("non-finite value {} in solution", bad));
    }
    Ok(x.iter().take(slice.len()).copied().collect())
}
