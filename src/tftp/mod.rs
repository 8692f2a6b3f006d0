//! TFTP (Trivial File Transfer Protocol) client
//!
//! This module implements the client side of
//! [RFC 1350](https://www.rfc-editor.org/rfc/rfc1350) TFTP Protocol version 2,
//! without the option extensions: fixed 512-byte blocks, a single transfer
//! mode, one block in flight at a time.
//!
//! ## Module Structure
//!
//! ```text
//! tftp/
//! ├── core/           # Core protocol implementation
//! │   ├── packet      # Packet serialization/deserialization
//! │   ├── socket      # Datagram transport abstraction
//! │   └── exchange    # Send-and-await with retransmission
//! │
//! └── client/         # TFTP client
//!     ├── sender      # Upload state machine
//!     ├── receiver    # Download state machine
//!     ├── session     # Per-transfer state
//!     ├── naming      # Non-colliding download names
//!     ├── error       # Failure kinds and result codes
//!     └── config      # Client configuration
//! ```
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use tftpc::tftp::client::{self, describe_result};
//! use std::path::Path;
//!
//! let code = client::send_file_default(Path::new("notes.txt"));
//! println!("{}", describe_result(code));
//! ```

// Submodules
pub mod client;
pub mod core;

#[cfg(test)]
pub(crate) mod testing;
