//! # popledger-pop3
//!
//! An async POP3 client library implementing RFC 1939.
//!
//! ## Features
//!
//! - **Type-state connection management**: Compile-time enforcement of the
//!   AUTHORIZATION → TRANSACTION → UPDATE progression
//! - **Authentication**: USER/PASS, APOP and RPOP
//! - **TLS support**: Both implicit TLS (port 995) and STLS (RFC 2595)
//! - **Extended response codes**: `[IN-USE]`, `[LOGIN-DELAY]`, `[SYS/TEMP]` (RFC 2449, RFC 3206)
//! - **Timeouts**: Bounded connect, handshake and per-line reads
//!
//! ## Quick Start
//!
//! ```ignore
//! use popledger_pop3::{AuthMechanism, Config, Security};
//! use popledger_pop3::connection::open;
//!
//! #[tokio::main]
//! async fn main() -> popledger_pop3::Result<()> {
//!     let config = Config::builder("pop.example.com")
//!         .security(Security::Implicit)
//!         .build();
//!
//!     let client = open(&config).await?;
//!     let mut client = client
//!         .authenticate(AuthMechanism::Plain, "user", "password")
//!         .await?;
//!
//!     for (number, uid) in client.uidl().await? {
//!         let raw = client.retr(number).await?;
//!         println!("{uid}: {} bytes", raw.len());
//!     }
//!
//!     client.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! ┌───────────────┐
//! │ Authorization │ ─── login() / apop() / rpop() ───→ Transaction
//! └───────────────┘                                        │
//!        │                                                 │
//!        └──────────────── quit() ──────────────── quit() ─┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: POP3 command builders
//! - [`connection`]: Connection management and type-state client
//! - [`parser`]: Status line and listing parsers
//! - [`types`]: Core POP3 types (identifiers, replies, mechanisms)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authorization, Client, Config, ConfigBuilder, FramedStream, Pop3Stream, Security, Transaction,
};
pub use error::{Error, Result};
pub use types::{AuthMechanism, MessageNumber, Reply, ResponseCode, Stat, Status, UniqueId};
