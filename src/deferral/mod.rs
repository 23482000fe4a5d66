pub mod error;
pub mod global;
pub mod ports;
pub mod registry;
pub mod types;

pub use error::{DeferralError, DeferralErrorKind};
pub use global::{global_registry, install_global_registry};
pub use ports::DeferralRegistryPort;
pub use registry::DeferralRegistry;
pub use types::{DeferralKey, DeferralOutcome, DeferralSnapshot, Deferred};
