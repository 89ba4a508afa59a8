pub mod config;
pub mod error;
pub mod event;
pub mod node;
pub mod protocol;
pub mod requeue;

pub use config::NodeConfig;
pub use error::NodeError;
pub use event::NodeEvent;
pub use node::{MineOutcome, Node};
pub use requeue::RequeuePolicy;
