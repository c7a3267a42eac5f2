//! API request handlers

pub mod issue;
pub mod verify;

pub use issue::issue_token;
pub use verify::verify_token;
