// Safewalk - companion check-in calls with safe-phrase transfer
// Library exports

pub mod assistant;
pub mod config;
pub mod errors;
pub mod logging;
pub mod persona;
pub mod server;
pub mod vapi;

pub use errors::{CoreError, CoreResult};
