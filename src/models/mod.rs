mod break_record;
mod daily_record;
mod duration;
mod notification;
mod session;

pub use break_record::BreakRecord;
pub use daily_record::DailyRecord;
pub use duration::WorkDuration;
pub use notification::{Notification, NotificationKind};
pub use session::SessionState;
