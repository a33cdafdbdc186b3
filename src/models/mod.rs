pub mod result;
pub mod status;

pub use result::{Suite, TestError, TestResult};
pub use status::{Speed, TestStatus};
