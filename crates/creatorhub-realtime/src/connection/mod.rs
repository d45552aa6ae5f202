//! Connection lifecycle: authentication, handles, pool, and heartbeat.

pub mod authenticator;
pub mod handle;
pub mod heartbeat;
pub mod manager;
pub mod pool;

pub use authenticator::ConnectionAuthenticator;
pub use handle::ConnectionHandle;
pub use heartbeat::{HeartbeatConfig, HeartbeatStatus};
pub use manager::ConnectionManager;
pub use pool::ConnectionPool;
