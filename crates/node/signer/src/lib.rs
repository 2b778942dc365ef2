#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::SignerError;

mod account;
pub use account::{AccountSeed, DEFAULT_SS58_PREFIX, ss58_decode, ss58_encode};

mod pool;
pub use pool::{MAX_UNHASHED_PAYLOAD, SigningPool, signing_payload, verify_signature};

pub use ed25519_dalek::{Signature, VerifyingKey};
