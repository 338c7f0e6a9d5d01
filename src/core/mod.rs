// src/core/mod.rs

pub mod config;
pub mod config_loader;
pub mod monitor;
pub mod privilege;
pub mod publisher;
pub mod sampling_loop;
pub mod sensors;
pub mod settings;
pub mod source_selector;
pub mod warning;
