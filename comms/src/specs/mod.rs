pub mod server;
pub mod worker;
