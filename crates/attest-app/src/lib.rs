pub mod db;
pub mod loader;
pub mod secure_store;
pub mod trust_store;
pub mod verifier;

pub use loader::{handle_load, LoadOutcome, Loader};
pub use trust_store::{TrustStore, TrustedKey};
