//! HTTP handlers.
//!
//! Protected handlers receive the verified identity as a [`VerifiedLaunch`]
//! extension installed by the signature gate and never read identity from
//! the unverified request.
//!
//! [`VerifiedLaunch`]: crate::domain::types::VerifiedLaunch

pub mod ads;
pub mod callback;
pub mod config;
pub mod health;
pub mod offers;
pub mod subscription;
