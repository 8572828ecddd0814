pub mod app_config;
pub mod booking_repo;
pub mod database;
#[cfg(feature = "kafka")]
pub mod events;
pub mod flight_repo;
pub mod memory;
pub mod redis_repo;
pub mod user_repo;

pub use booking_repo::PostgresReservationStore;
pub use database::DbClient;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use memory::InMemoryStore;
pub use redis_repo::RedisClient;
pub use user_repo::PostgresUserDirectory;
