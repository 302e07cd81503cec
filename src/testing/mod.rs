pub mod stubs;

pub use stubs::VecStream;
