//! Monitor module - universe resolution, stream supervision, momentum sweep and alert routing

pub mod pipeline;
pub mod runtime;
pub mod supervisor;
pub mod sweep;
pub mod universe;

pub use pipeline::{AlertPipeline, Dispatcher};
pub use runtime::MonitorRuntime;
pub use supervisor::StreamSupervisor;
pub use sweep::MomentumSweep;
pub use universe::{SymbolUniverse, UniverseHandle, UniverseResolver};
