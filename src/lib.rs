pub mod collection;
pub mod commands;
pub mod config;
pub mod derive;
pub mod models;
pub mod notify;
pub mod services;
pub mod session;
pub mod store;
pub mod timer;
pub mod timestamp;
pub mod tui;
pub mod view;
