//! Steps, position mapping and transactions.
//!
//! Every document change is expressed as a [`Step`]. Steps are applied
//! through a [`Transaction`], which keeps the intermediate documents and a
//! [`Mapping`] so positions from before the transaction can be carried
//! forward, and so each step can be inverted for undo.

mod mapping;
mod step;
mod transaction;

pub use mapping::{MapResult, Mappable, Mapping, StepMap};
pub use step::Step;
pub use transaction::{MetaKey, Transaction};
