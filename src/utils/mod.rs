pub mod logging;
pub mod sync;

pub use logging::init_logging;
