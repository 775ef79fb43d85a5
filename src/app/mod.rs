pub mod aliases;
pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod clock;
pub mod config;
pub mod db;
pub mod middleware;
pub mod swagger;
