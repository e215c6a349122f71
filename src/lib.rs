pub mod cache;
pub mod commands;
pub mod config;
pub mod event;
pub mod shell;
pub mod tvdb;
