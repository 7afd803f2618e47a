pub mod aws;
pub mod cli;
pub mod definition;
pub mod error;
pub mod lifecycle;
pub mod process;
pub mod profiles;
pub mod runner;

pub use definition::{Definition, DefinitionOpts};
pub use error::{Result, SortieError};
pub use lifecycle::{TaskLifecycle, TaskState};
pub use runner::{Ecspresso, Runner, WaitMode};
