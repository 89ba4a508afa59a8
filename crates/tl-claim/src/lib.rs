pub mod claim;
pub mod error;
pub mod queue;
pub mod validation_level;

pub use claim::{Claim, ClaimInput};
pub use error::ClaimError;
pub use queue::ClaimQueue;
pub use validation_level::ValidationLevel;
