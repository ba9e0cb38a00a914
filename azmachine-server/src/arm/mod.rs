//! Azure Resource Manager backend
//!
//! A thin REST client over reqwest: one [`clients::ArmSession`] per secret
//! implements every backend client trait, and long-running operations are
//! tracked through the monitor URL ARM hands back.

pub mod auth;
pub mod clients;
pub mod poller;
pub mod urls;
pub mod wire;

pub use clients::ArmClientFactory;
