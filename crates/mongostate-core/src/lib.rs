//! mongostate core - declared index model shared by every mongostate crate
//!
//! This crate defines the desired-state shape of a MongoDB index and the
//! types both reconciliation directions agree on:
//!
//! - `Index`, `IndexKey`, `IndexOptions`, `Collation` - the declared configuration
//! - `IndexIdentity` - the immutable (database, collection, name) triple
//! - `IndexValue` - typed generic value used for partial filter expressions
//! - `ClientConfig` - connection settings for the MongoDB client
//! - `MongostateError` - the error taxonomy

mod config;
mod error;
mod identity;
mod index;
mod value;

pub use config::*;
pub use error::*;
pub use identity::*;
pub use index::*;
pub use value::*;
