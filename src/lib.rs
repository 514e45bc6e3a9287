/// Session and logging configuration loading.
pub mod config;
/// Key expressions: `/`-delimited paths with `*` and `**` wildcards.
pub mod keyexpr;
/// Transport boundary: Link, Connector, in-memory links, wire frames.
pub mod link;
/// Structured logging (filters, console and file sinks).
pub mod logging;
/// Pub/Sub core: Sample, Listener, SubscriptionTable, Router.
pub mod pubsub;
/// Session lifecycle: declare, publish, undeclare, close.
pub mod session;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::{SessionConfig, Settings};
/// Key expressions.
pub use keyexpr::{IntoKeyExpr, KeyExpr, Segment};
/// Error types and the result alias of the public API.
pub use keyroute_error::{
    ConfigError, KeyExprError, LinkError, ListenerError, RecvError, RouteResult, SessionError,
    StackError, StatusCode, SubscriptionError, TryRecvError,
};
/// Transport boundary.
pub use link::{Connector, FrameHandler, Link, LinkId, MemoryConnector, MemoryLink};
/// Logging.
pub use logging::{init_logging, LoggingConfig, LoggingHandle};
/// Pub/Sub API.
pub use pubsub::{
    DispatchReport, Listener, ListenerResult, Sample, SampleKind, SubscriptionId, Timestamp,
};
/// Session API.
pub use session::{ChannelSubscriber, LinkStats, Session, Subscriber};
