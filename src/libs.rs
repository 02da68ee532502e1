pub mod core;
pub mod error;
pub mod service;
pub mod storage;
