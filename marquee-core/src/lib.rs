pub mod events;
pub mod ledger;
pub mod repository;
pub mod scheduler;

pub use events::{EventPublisher, PublishError};
pub use ledger::{LedgerError, SeatLedger};
pub use repository::{
    BookingStore, ExpireOutcome, SettleOutcome, ShowStore, StoreError, UserStore,
};
pub use scheduler::{ExpiryScheduler, ExpiryTask, SchedulerError};
