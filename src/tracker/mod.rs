pub mod accrual;
pub mod controller;
pub mod debounce;
pub mod notifications;
pub mod state;

pub use accrual::{efficiency, Accrual};
pub use controller::{TimeAccrualEngine, TrackerEvent, TrackerSnapshot};
pub use state::{Phase, TrackerState};
