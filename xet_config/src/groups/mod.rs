pub mod client;
pub mod reconstruction;
