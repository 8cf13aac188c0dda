pub mod api;
pub mod core;
pub mod data;
pub mod error;
pub mod lookup;
pub mod session;
