//! Numerical building blocks shared by the optimizer and the estimators.

pub mod banded;
pub mod finite_difference;
pub mod linear_solve;

pub use banded::{solve_pentadiagonal, solve_tridiagonal};
pub use linear_solve::{polyfit, polyval, solve_lu};
