//! Connection pool management

mod postgres;

pub use postgres::{create_pool, run_migrations, PoolConfig};
pub use sqlx::PgPool;
