//! Backend steps used by the machine orchestrations
//!
//! Each step is a free `activity` function taking the context and the client
//! bundle. Steps report every backend call to the API counters and map
//! backend failures onto [`crate::error::Error`].

pub mod create_nic;
pub mod create_vm;
pub mod delete_disk;
pub mod delete_nic;
pub mod delete_vm;
pub mod get_vm;
pub mod resolve_image;
pub mod resolve_subnet;
