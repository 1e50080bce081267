//! Object store backend implementations

pub mod http;
pub mod local;
pub mod memory;

pub use http::HttpObjectStore;
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;
