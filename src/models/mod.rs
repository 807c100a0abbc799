pub mod context;
pub mod enums;
pub mod feedback;
pub mod patient;
pub mod safety;
pub mod suggestion;

pub use context::*;
pub use feedback::*;
pub use patient::*;
pub use safety::*;
pub use suggestion::*;
