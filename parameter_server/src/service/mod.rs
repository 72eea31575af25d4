mod builder;
mod pserver;
mod server;

pub use builder::ServerBuilder;
pub use pserver::ParameterServer;
pub use server::Server;
