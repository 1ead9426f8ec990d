// Entity Models - the records the Open Hands store persists
//
// Each entity mirrors one table of the program database. Column names stay
// in Spanish (the store's contract); Rust identifiers are English.

pub mod user;
pub mod group;
pub mod cycle;
pub mod report;
pub mod saver;

pub use user::{Role, User};
pub use group::{SavingsGroup, SavingsType};
pub use cycle::{Cycle, CycleState, CycleStatus};
pub use report::MonthlyReport;
pub use saver::{Movement, Participant};
