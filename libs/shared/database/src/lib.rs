pub mod postgres;

pub use postgres::{connect, run_migrations};
pub use sqlx::PgPool;
