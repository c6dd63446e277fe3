pub mod app;
pub mod chart;
pub mod config;
pub mod domain;
pub mod error;
pub mod github;
pub mod openbis;
pub mod output;
pub mod queries;
pub mod taxonomy;
pub mod writer;
