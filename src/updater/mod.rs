//! Self-update coordination.
//!
//! - [`Scanner`] checks entities for updates in bounded concurrent groups
//! - [`UpdateSession`] owns the persisted state and every transition
//! - progress flows from the scanner back through [`ScanProgress`]

mod scanner;
mod session;
mod state;
#[cfg(test)]
mod tests;

#[cfg(test)]
pub use scanner::ScanProgress;
pub use scanner::{Scanner, DEFAULT_GROUP_SIZE};
pub use session::UpdateSession;
pub use state::SessionPhase;
