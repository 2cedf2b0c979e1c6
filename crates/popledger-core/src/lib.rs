//! # popledger-core
//!
//! Mailbox logic for `PopLedger`.
//!
//! This crate provides:
//! - Account configuration loading and validation
//! - [`MailboxSession`]: an authenticated POP3 session that signs out on
//!   every exit path
//! - New-message detection by unique id ([`UidIndex`], [`KnownUids`])
//! - Retrieval and MIME decoding into a [`FetchResult`]
//! - A persisted set of already retrieved unique ids
//!
//! ## Example
//!
//! ```ignore
//! use popledger_core::{AccountConfig, KnownUids, MailboxSession};
//!
//! let config = AccountConfig::new("pop.example.com", "alice", "secret");
//! let known: KnownUids = ["uid-1", "uid-2"].into_iter().collect();
//!
//! let messages = MailboxSession::with_session(&config, |session| {
//!     Box::pin(async move { session.fetch_new(&known).await })
//! })
//! .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
mod error;
pub mod mailbox;

pub use account::{
    AccountConfig, ConnectionOptions, ValidationError, ValidationResult, default_config_path,
    load_config, save_config, validate_account,
};
pub use error::{Error, Result};
pub use mailbox::{
    FetchResult, KnownUids, MailboxSession, SessionFuture, UidIndex, default_seen_path, load_seen,
    save_seen,
};
pub use popledger_mime::{BodyPart, ParsedMessage, Payload};
pub use popledger_pop3::{AuthMechanism, MessageNumber, ResponseCode, Security, UniqueId};
