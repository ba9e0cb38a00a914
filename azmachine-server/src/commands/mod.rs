pub mod machine;
pub mod server;
