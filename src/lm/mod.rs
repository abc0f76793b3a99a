//! Levenberg-Marquardt algorithm implementation.
//!
//! This module provides a damped Gauss-Newton solver for nonlinear
//! least-squares problems. The Jacobian is approximated by forward
//! differences and the damped normal equations are solved by dense LU.

pub mod algorithm;
pub mod config;

// Re-export key types
pub use algorithm::{optimize, LevenbergMarquardt, LmResult};
pub use config::LmConfig;
