pub mod bookings;
pub mod identities;
pub mod mentors;
pub mod pool;
pub mod profiles;
pub mod rows;
pub mod sessions;
pub mod update;

pub use bookings::*;
pub use identities::*;
pub use mentors::*;
pub use pool::*;
pub use profiles::*;
pub use rows::*;
pub use sessions::*;
pub use update::*;
