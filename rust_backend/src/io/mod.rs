//! Case-table loading.
//!
//! Loaders read case rows from CSV (through polars) or JSON (through
//! serde_json) and attach error context for I/O and parse failures.
//!
//! # Example
//!
//! ```no_run
//! use epi_rt::io::loaders::CaseLoader;
//! use std::path::Path;
//!
//! let result = CaseLoader::load_from_file(Path::new("cases.csv"))
//!     .expect("Failed to load");
//! println!("Loaded {} rows across {} regions", result.num_rows, result.num_regions);
//! ```

pub mod loaders;


pub use loaders::{dataframe_to_rows, CaseLoadResult, CaseLoader, CaseSourceType};
