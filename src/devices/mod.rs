//! Simulated devices and the in-memory host they live on.

/// Daily-pattern consumer.
pub mod baseload;
/// Stationary battery storage model.
pub mod battery;
/// Switchable fuelled generator.
pub mod generator;
pub mod grid;
/// Unmanaged solar supply.
pub mod solar;
pub mod types;

pub use baseload::BaseLoad;
pub use battery::Battery;
pub use generator::Generator;
pub use grid::{NetworkFlows, SimGrid};
pub use solar::SolarPv;
pub use types::Device;
pub use types::DeviceContext;
