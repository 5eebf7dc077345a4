//! Trellis Registry API - backend-neutral registration contract
//!
//! This crate defines the contract every registry backend satisfies:
//!
//! - **RegisterRepository**: announce the local gateway instance and
//!   discover peer instances through an external service registry
//! - **ServiceInstance**: the gateway's minimal instance record
//! - **BackendRegistry**: startup-time lookup table for selecting a
//!   backend by name
//!
//! ## One adapter, one backend
//!
//! A repository instance talks to exactly one registry backend, chosen
//! by configuration at startup. Backends live in sibling crates and
//! install themselves into a [`BackendRegistry`] at composition time.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod backend;
pub mod config;
pub mod error;
pub mod instance;
pub mod repository;

// Re-exports
pub use backend::{BackendFactory, BackendRegistry};
pub use config::RegisterConfig;
pub use error::{RegistryError, Result};
pub use instance::ServiceInstance;
pub use repository::RegisterRepository;
