//! local_optimizer::builders — L-BFGS solver construction helpers.
//!
//! Purpose
//! -------
//! Build L-BFGS solvers wired to either line search and apply the
//! crate-level options (memory size, backend tolerances) so higher-level
//! code never touches argmin's generic wiring.
//!
//! Conventions
//! -----------
//! - The builders do **not** set the starting point or `max_iters`; the
//!   runner applies those at execution time.
//! - argmin's own tolerances are set to the same values as the labelled
//!   rules in [`super::stopping`], which are checked first.
//! - Errors are reported via [`OptResult`]; raw argmin errors never cross
//!   the module boundary.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    local_optimizer::{
        traits::MinimizeOptions,
        types::{
            Cost, DEFAULT_LBFGS_MEM, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente,
            MoreThuenteLS, Point,
        },
    },
};

/// build_optimizer_hager_zhang — construct L-BFGS with Hager–Zhang line search.
///
/// Uses `opts.lbfgs_mem` (or [`DEFAULT_LBFGS_MEM`]) and applies any
/// configured tolerances through [`configure_lbfgs`].
///
/// # Errors
/// `OptError` (via `From<argmin::core::Error>`) when argmin rejects a
/// tolerance.
pub fn build_optimizer_hager_zhang(opts: &MinimizeOptions) -> OptResult<LbfgsHagerZhang> {
    let hager_zhang = HagerZhangLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsHagerZhang::new(hager_zhang, mem);
    configure_lbfgs(lbfgs, opts)
}

/// build_optimizer_more_thuente — construct L-BFGS with More–Thuente line search.
///
/// # Errors
/// `OptError` (via `From<argmin::core::Error>`) when argmin rejects a
/// tolerance.
pub fn build_optimizer_more_thuente(opts: &MinimizeOptions) -> OptResult<LbfgsMoreThuente> {
    let more_thuente = MoreThuenteLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsMoreThuente::new(more_thuente, mem);
    configure_lbfgs(lbfgs, opts)
}

/// configure_lbfgs — apply optional tolerances to an L-BFGS solver.
///
/// When a tolerance is `None` the corresponding `with_tolerance_*` is not
/// called and argmin's default remains in effect.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Point, Grad, Cost>, opts: &MinimizeOptions,
) -> OptResult<LBFGS<L, Point, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::local_optimizer::traits::{LineSearcher, Tolerances};

    #[test]
    // Purpose
    // -------
    // Both builders succeed with the default memory and with an explicit one.
    fn builders_accept_default_and_explicit_memory() {
        // Arrange
        let tols = Tolerances::new(Some(1e-6), Some(1e-12), None, Some(50))
            .expect("Tolerances should be valid");
        let default_mem = MinimizeOptions::new(tols, LineSearcher::HagerZhang, None)
            .expect("options should be valid");
        let explicit_mem = MinimizeOptions::new(tols, LineSearcher::MoreThuente, Some(11))
            .expect("options should be valid");

        // Act / Assert
        assert!(build_optimizer_hager_zhang(&default_mem).is_ok());
        assert!(build_optimizer_more_thuente(&default_mem).is_ok());
        assert!(build_optimizer_hager_zhang(&explicit_mem).is_ok());
        assert!(build_optimizer_more_thuente(&explicit_mem).is_ok());
    }

    #[test]
    // Purpose
    // -------
    // `configure_lbfgs` leaves the solver usable when only a parameter rule
    // and an iteration cap are configured.
    fn configure_lbfgs_with_no_backend_tolerances() {
        // Arrange
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(1e-10), Some(10)).expect("valid tolerances");
        let opts = MinimizeOptions::new(tols, LineSearcher::MoreThuente, None)
            .expect("options should be valid");

        // Act
        let configured = configure_lbfgs(raw, &opts);

        // Assert
        assert!(configured.is_ok());
    }
}
