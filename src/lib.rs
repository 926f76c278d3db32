pub mod config;
pub mod data_models;
pub mod error;
pub mod notifications;
pub mod observer;
pub mod provider;
pub mod search;
pub mod timer;
