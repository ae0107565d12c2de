pub mod bridge;
pub mod server;
