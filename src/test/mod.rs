pub mod env;
pub mod sessions;
pub mod utils;

pub use utils::test_utils;
