//! Multi-tenant access control.
//!
//! A [`Principal`] is re-derived from the store on every request. The
//! [`scope`] module turns it into row filters for list and retrieve paths,
//! [`policy`] decides whether a mutation of a company's owner groups is
//! allowed, and [`membership`] reads and writes the group join tables.

pub mod error;
pub mod membership;
pub mod policy;
pub mod principal;
pub mod scope;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{AccessError, Result};
pub use principal::Principal;
pub use scope::TenantScope;
