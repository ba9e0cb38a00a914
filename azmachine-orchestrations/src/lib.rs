//! azmachine Orchestrations - provisioning and teardown of a single Azure VM
//!
//! This crate creates a virtual machine together with the NIC and managed
//! disks it depends on, and removes all of them again. Every backend call goes
//! through the per-kind client traits in [`backend`], so the same
//! orchestrations run against Azure Resource Manager or the in-memory
//! [`fake::FakeCloud`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use azmachine_orchestrations::fake::FakeCloud;
//! use azmachine_orchestrations::{create_machine, CreateMachineRequest, ProvisionContext};
//!
//! # async fn example(request: CreateMachineRequest) -> anyhow::Result<()> {
//! let cloud = FakeCloud::new();
//! let ctx = ProvisionContext::new(&request.machine_name);
//!
//! let output = create_machine(&ctx, &cloud, &request).await?;
//! println!("created {}", output.handle.provider_id);
//! # Ok(())
//! # }
//! ```

pub mod activity_names;
pub mod backend;
pub mod context;
pub mod disks;
pub mod error;
pub mod fake;
pub mod metrics;
pub mod names;
pub mod resources;
pub mod types;

pub mod activities;
mod orchestrations;

pub use context::ProvisionContext;
pub use error::{Error, ErrorClass, Result};
pub use orchestrations::create_machine::{create_machine, provision_machine};
pub use orchestrations::delete_machine::{delete_machine, teardown};
pub use orchestrations::machine_status::get_machine_status;
pub use types::*;
