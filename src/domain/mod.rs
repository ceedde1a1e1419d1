mod balance;
mod ledger;
mod points;
mod policy;
mod transaction;
mod validation;

pub use balance::*;
pub use ledger::*;
pub use points::*;
pub use policy::*;
pub use transaction::*;
pub use validation::*;
