//! Case-series transformations.
//!
//! # Modules
//!
//! - [`cleaning`]: Complete the date index, impute zeros, pad seeding and horizon
//! - [`shifting`]: Smoothed, delay-shifted infection proxy

pub mod cleaning;
pub mod shifting;

pub use cleaning::{complete_dates, impute_zeros, pad_series, CaseCleaner};
pub use shifting::{rolling_mean, shifted_cases};
