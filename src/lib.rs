use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub mod app;
pub mod board;
pub mod identity;
pub mod lifecycle;
pub mod models;
pub mod routes;
pub mod schema;

/// Migrations embedded into the binary which helps with streamlining image building process
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
