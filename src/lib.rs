pub mod callbacks;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod simulation;
pub mod utils;
