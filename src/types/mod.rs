pub mod errors;
pub mod outcome;
pub mod report;
pub mod severity;

pub use errors::*;
pub use outcome::*;
pub use report::*;
pub use severity::*;
