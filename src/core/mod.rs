pub mod compare;
pub mod config;
pub mod credential;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod history;
pub mod registry;
pub mod style;
