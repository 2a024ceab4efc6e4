//! # VPanel – Core
//!
//! Types shared by every provisioning backend: the closed [`Protocol`]
//! selector, the roster [`Credential`] record, the [`ProvisionError`]
//! taxonomy, and the port allocator used by per-credential inbounds.

pub mod credential;
pub mod error;
pub mod ports;
pub mod protocol;
pub mod validation;

pub use credential::{Credential, DEFAULT_ALTER_ID, SHADOWSOCKS_METHOD};
pub use error::{ErrorKind, ProvisionError, ProvisionResult};
pub use ports::{next_free_port, PORT_RANGE_BASE};
pub use protocol::{BackendKind, DocumentLayout, DocumentPaths, LocalProtocol, Protocol};
