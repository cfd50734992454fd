mod account;
mod money;
mod strategy;
mod transaction;
mod user;

pub use account::*;
pub use money::*;
pub use strategy::*;
pub use transaction::*;
pub use user::*;
