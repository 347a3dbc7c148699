pub mod driver;
pub mod state;

pub use driver::DemoDriver;
pub use state::{DemoState, DemoView, Phase};
