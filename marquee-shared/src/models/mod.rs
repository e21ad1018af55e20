pub mod booking;
pub mod events;
pub mod show;
pub mod user;
