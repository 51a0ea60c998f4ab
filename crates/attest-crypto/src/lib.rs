pub mod error;
pub mod identity;
pub mod keychain;
pub mod keystore;

pub use error::CryptoError;
pub use identity::Identity;
pub use keychain::Keychain;
