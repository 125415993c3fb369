pub mod auth;
pub mod identity;
pub mod policy;
pub mod session;

pub use auth::*;
pub use identity::*;
pub use policy::*;
pub use session::*;
