pub mod attachment;
pub mod chat_stream;
pub mod client;
pub mod config;
pub mod error;
pub mod message;
pub mod request;
pub mod session;
pub mod store;
