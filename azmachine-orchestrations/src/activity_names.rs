//! Name constants for azmachine activities
//!
//! Following the naming convention: {crate-name}::{type}::{name}. The names
//! label every step in logs and in cancellation/deadline errors.

/// Activity names
pub mod activities {
    /// Read the subnet the NIC will be placed in
    ///
    /// **Idempotent:** Yes (read only)
    pub const RESOLVE_SUBNET: &str = "azmachine::activity::resolve-subnet";

    /// Create the NIC, wait for it, and read it back
    ///
    /// **Idempotent:** Yes (create-or-update)
    pub const CREATE_NIC: &str = "azmachine::activity::create-nic";

    /// Resolve a marketplace image and accept its plan terms if needed
    ///
    /// **Idempotent:** Yes (terms are only accepted once)
    pub const RESOLVE_IMAGE: &str = "azmachine::activity::resolve-image";

    /// Create the VM, wait for it, and read it back
    ///
    /// **Idempotent:** Yes (create-or-update)
    pub const CREATE_VM: &str = "azmachine::activity::create-vm";

    /// Detach data disks and delete the VM
    ///
    /// **Idempotent:** Yes (no-op if the VM does not exist)
    pub const DELETE_VM: &str = "azmachine::activity::delete-vm";

    /// Delete the NIC unless another VM holds it
    ///
    /// **Idempotent:** Yes (no-op if the NIC does not exist)
    pub const DELETE_NIC: &str = "azmachine::activity::delete-nic";

    /// Delete a managed disk
    ///
    /// **Idempotent:** Yes (no-op if the disk does not exist)
    pub const DELETE_DISK: &str = "azmachine::activity::delete-disk";

    /// Read the VM back for a status query
    pub const GET_VM: &str = "azmachine::activity::get-vm";

    /// Build the per-kind client bundle from the secret
    pub const SETUP_CLIENTS: &str = "azmachine::activity::setup-clients";
}
