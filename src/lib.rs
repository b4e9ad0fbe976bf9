// Library for tests to access modules

pub mod archive;
pub mod chart;
pub mod config;
pub mod error;
pub mod exec;
pub mod history;
pub mod latency;
pub mod models;
pub mod process;
pub mod procfs;
pub mod rate;
pub mod route;
pub mod subsystem;
pub mod version;
