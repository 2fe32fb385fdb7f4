//! Key material for authenticated and encrypted session cookies. Each
//! submodule focuses on a single responsibility so the security model stays
//! simple and auditable.

pub mod codec;
pub mod store;

pub use codec::{CodecList, Keypair};
pub use store::{load, load_or_create, rotate, KeystoreError};
