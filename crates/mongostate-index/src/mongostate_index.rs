//! MongoDB index reconciliation for mongostate
//!
//! This crate translates between the declared index shape defined in
//! `mongostate-core` and what a MongoDB server understands and reports.
//!
//! # Features
//!
//! - Normalizer: declared `Index` to a `createIndexes` entry, with per-kind
//!   option suppression and a fixed index format version
//! - Reconciler: `listIndexes` output back to the declared shape
//! - `IndexBackend` seam over the three database calls used
//! - `IndexManager` create / read / delete / replace lifecycle
//!
//! # Example
//!
//! ```ignore
//! use mongostate_core::{ClientConfig, Index};
//! use mongostate_index::{IndexManager, MongoBackend};
//!
//! let backend = MongoBackend::connect(&ClientConfig::default()).await?;
//! let manager = IndexManager::new(backend);
//! let index = Index::from_json_str(&std::fs::read_to_string("index.json")?)?;
//! let created = manager.create(&index).await?;
//! ```

mod backend;
mod manager;
#[cfg(test)]
mod manager_tests;
mod normalize;
#[cfg(test)]
mod normalize_tests;
mod reconcile;
#[cfg(test)]
mod reconcile_tests;
#[cfg(test)]
mod simulated;

pub use backend::*;
pub use manager::*;
pub use normalize::*;
pub use reconcile::*;
