// Application layer - orchestration around the domain rules:
// the transaction engine, observer fan-out, the ledger service that owns
// users and accounts, and the logged-in session used by the shell.

pub mod clock;
pub mod engine;
pub mod error;
pub mod observer;
pub mod observers;
pub mod service;
pub mod session;
pub mod shared;

pub use clock::*;
pub use engine::*;
pub use error::*;
pub use observer::*;
pub use observers::*;
pub use service::*;
pub use session::*;
pub use shared::*;
