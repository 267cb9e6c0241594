pub mod normalize;
pub mod subscription;
pub mod types;

pub use normalize::{get_message, time_string, EventNormalizer};
pub use subscription::Subscription;
pub use types::{HostEvent, LogEvent};
