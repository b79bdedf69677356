pub mod dispatch_queue;
pub mod gateway;
pub mod motion;
pub mod receiver;
pub mod state;
pub mod supervisor;
pub mod worker;

pub use dispatch_queue::*;
pub use gateway::*;
pub use motion::*;
pub use receiver::*;
pub use state::*;
pub use supervisor::*;
pub use worker::*;
