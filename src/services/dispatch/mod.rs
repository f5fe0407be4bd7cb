pub mod dispatcher;
pub mod envelope;
pub mod routes;

pub use dispatcher::{DispatchFailure, DispatchPolicy, Dispatched, MAX_ATTEMPTS, RequestDispatcher};
pub use envelope::{MessageEnvelope, ReplyPacket};
pub use routes::{RouteEntry, RouteError, RouteTable};
