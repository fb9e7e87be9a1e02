//! Sample plugin implementations

pub mod event_log;
pub mod greeter;
pub mod reporter;

pub use event_log::{EventLogPlugin, LifecycleEvent};
pub use greeter::{GreeterPlugin, GreeterSettings};
pub use reporter::{RegistrySummary, ReporterPlugin};
