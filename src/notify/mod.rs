/// Rate-limited message notifier
pub mod clock;
pub mod notifier;
pub mod rate_limiter;

pub use clock::{Clock, ManualClock, SystemClock};
pub use notifier::{Notifier, NotifierDefaults};
pub use rate_limiter::RateLimiter;
