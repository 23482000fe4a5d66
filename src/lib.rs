pub mod config;
pub mod deferral;

pub use config::{DeferralConfig, DeferralConfigPatch};
pub use deferral::{
    DeferralError, DeferralErrorKind, DeferralKey, DeferralOutcome, DeferralRegistry,
    DeferralRegistryPort, DeferralSnapshot, Deferred,
};
