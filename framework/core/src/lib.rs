mod error;
mod http;
mod shutdown;

pub mod prelude {
    pub use crate::error::{CheckPredicateError, ConfigError, NoResponseError, TransportError};
    pub use crate::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
    pub use crate::shutdown::{DelegatedShutdownListener, ShutdownHandle};
}
