pub mod angle;
pub mod config;
pub mod counter;
pub mod pose;
pub mod protocol;
pub mod session;
