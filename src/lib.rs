pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod parameters;
pub mod remote;
pub mod resources;
pub mod script;
