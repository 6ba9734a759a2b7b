//! Alert module - decision engines, per-symbol state, cooldown gate and message rendering

pub mod composer;
pub mod engine;
pub mod gate;
pub mod state;
pub mod types;

pub use composer::MessageComposer;
pub use engine::{CandleMoveEngine, MomentumEvaluator, StatDeviationEngine};
pub use gate::NotificationGate;
pub use state::AlertStateStore;
pub use types::{AlertKind, AlertModeConfig};
