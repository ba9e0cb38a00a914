pub mod create_machine;
pub mod delete_machine;
pub mod machine_status;
