//! Mailbox sessions and new-message detection.

mod model;
mod seen;
mod session;

pub use model::{FetchResult, KnownUids, UidIndex};
pub use seen::{default_seen_path, load_seen, save_seen};
pub use session::{MailboxSession, SessionFuture};
