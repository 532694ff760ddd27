pub mod audit;
pub mod auth_flow;
pub mod backend;
pub mod config;
pub mod derived;
pub mod error;
pub mod handshake;
pub mod launch;
pub mod model;
pub mod navigation;
pub mod playback;
pub mod report;
pub mod run_controller;
pub mod session;

#[cfg(test)]
pub(crate) mod test_utils;
