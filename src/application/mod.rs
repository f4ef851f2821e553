pub mod catalog;
mod dependencies;
pub mod inventory;
mod retry;

pub use dependencies::{LendingPolicy, ServiceDependencies};
pub use retry::RetryPolicy;
