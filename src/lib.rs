pub mod calculator;
pub mod config;
pub mod logging;
pub mod screen;
