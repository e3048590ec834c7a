//! Domain model (IDs, request/response shapes, outcomes, states, errors).

pub mod errors;
pub mod ids;
pub mod outcome;
pub mod request;
pub mod response;
pub mod state;

pub use self::errors::{RequestError, TransportError};
pub use self::ids::{Id, IdMarker, RequestId};
pub use self::outcome::AttemptOutcome;
pub use self::request::{ApiRequest, Method, RequestOptions};
pub use self::response::{ApiResponse, SUCCESS_STATUS_LIMIT};
pub use self::state::RequestState;
