/// Real-time fan-out over WebSockets
///
/// - `registry`: connections and the channels they joined
/// - `hub`: the `EventPublisher` that routes events through the registry
/// - `socket`: the `/ws` upgrade handler and per-connection loop

pub mod hub;
pub mod registry;
pub mod socket;

pub use hub::Hub;
pub use registry::{Channel, ConnectionId, SubscriptionRegistry};
