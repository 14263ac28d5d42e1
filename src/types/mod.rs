//! Wire and domain types.

mod common;
mod customization;
mod provisioning;
mod record;
mod runtime;

pub use common::*;
pub use customization::*;
pub use provisioning::*;
pub use record::*;
pub use runtime::*;
