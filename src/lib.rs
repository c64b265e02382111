pub mod config;
pub mod data;
pub mod error;
pub mod fitness;
pub mod fitting;
pub mod model;
pub mod optics;
pub mod optimizer;
pub mod simulator;
// cmd and reports belong to the binary (main.rs).
