//! Request extractors.

pub mod origin;
pub mod user;

pub use origin::RequestOrigin;
pub use user::CurrentUser;
