pub mod audit;
pub mod changes;
pub mod engine;
pub mod lifecycle;
pub mod locks;
pub mod maintenance;

pub use audit::InventoryReport;
pub use changes::{ChangeHandler, ModifyRequest};
pub use engine::{CancelOutcome, CascadeReport, EnginePolicy, ReservationEngine, ReserveRequest};
pub use lifecycle::{BookingLifecycle, Transition};
pub use maintenance::{FlightRepairer, RepairOutcome};
