pub mod platform;
pub mod protocol;
pub mod turn;
pub mod usage;

pub use platform::PlatformId;
pub use protocol::{Message, MessageKind, SummaryReply, SummaryRequest, SummaryResponse};
pub use turn::Turn;
pub use usage::{UsageRecord, UsageVerdict};
