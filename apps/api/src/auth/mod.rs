//! Accounts, password hashing, JWT issuance and the `CurrentUser` extractor.

pub mod accounts;
pub mod extractor;
pub mod handlers;
pub mod jwt;
pub mod password;

pub use extractor::CurrentUser;
pub use jwt::AuthConfig;
