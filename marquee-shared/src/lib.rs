pub mod models;
pub mod pii;

pub use models::booking::{Booking, HoldState};
pub use models::events::{DomainEvent, EmailNotification, SeatAction, SeatActivityEvent};
pub use models::show::Show;
pub use models::user::User;
