pub mod clock;
pub mod errors;
pub mod retry;
pub mod shutdown;

pub use clock::{Clock, FixedClock, SharedClock, SystemClock};
pub use errors::DomainError;
pub use retry::{retry_with_backoff, RetryConfig, RetryError};
pub use shutdown::{ShutdownCoordinator, ShutdownSignal};
