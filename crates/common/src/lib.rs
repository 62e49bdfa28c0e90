//! Common utilities and shared types for murmur.
//!
//! This crate provides foundational components used across all murmur crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Cryptography**: RSA key generation for signing outbound activities
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use murmur_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("{} serves {}", config.local_domain()?, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crypto;
pub mod error;
pub mod id;

pub use config::Config;
pub use crypto::{RsaKeypair, generate_rsa_keypair};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
