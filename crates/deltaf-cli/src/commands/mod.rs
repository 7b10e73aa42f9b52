pub mod args;
pub mod batch;
pub mod config;
pub mod delta;
pub mod group;
pub mod info;
pub mod pipeline;
