//! Azure Log Analytics widget plumbing.
//!
//! One logs client per subscription, built on first query and kept for the
//! life of the process. Each client caches its own access token.

mod clients;
mod credentials;
mod query;

pub use clients::{AzureEndpoints, LogsClients, QueryTarget};
pub use credentials::ClientSecretCredential;
