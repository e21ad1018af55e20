pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod redis_repo;
pub mod scheduler_repo;
pub mod show_repo;
pub mod user_repo;

pub use booking_repo::StoreBookingRepository;
pub use database::DbClient;
pub use events::EventProducer;
pub use redis_repo::RedisClient;
pub use scheduler_repo::StoreExpiryScheduler;
pub use show_repo::StoreShowRepository;
pub use user_repo::StoreUserRepository;
