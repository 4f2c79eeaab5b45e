//! # relay-db
//!
//! Implementations of the delivery collaborator traits from `relay-core`.
//!
//! - [`postgres`]: SQLx-backed stores used in deployed gateways
//! - [`memory`]: process-local stores for development and tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use relay_db::{create_pool, run_migrations, PgChatMessageStore, PoolConfig};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&PoolConfig::from_env()).await?;
//!     run_migrations(&pool).await?;
//!     let store = PgChatMessageStore::new(pool, Default::default());
//!     Ok(())
//! }
//! ```

pub mod memory;
pub mod pool;
pub mod postgres;

// Re-export commonly used types
pub use memory::{InMemoryChatStore, InMemoryNotificationStore, InMemoryRoomDirectory};
pub use pool::{create_pool, run_migrations, PgPool, PoolConfig};
pub use postgres::{PgChatMessageStore, PgNotificationStore, PgRoomAuthorizer};
