//! # hibp-lib
//!
//! Query the Have I Been Pwned breach API concurrently.
//!
//! Build one [`QueryRequest`] per lookup, hand a batch to a [`Dispatcher`],
//! and read each request's [`Outcome`] back. The dispatcher caps the number
//! of in-flight calls, applies a batch deadline, and never lets one failing
//! query abort its siblings.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hibp_lib::{DispatchConfig, Dispatcher, Outcome, QueryRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::with_config(DispatchConfig::default().with_concurrency(4))?;
//!
//!     let requests = vec![
//!         QueryRequest::for_account("test@example.com")?,
//!         QueryRequest::for_domain("adobe.com")?,
//!         QueryRequest::for_breach_name("adobe"),
//!     ];
//!
//!     let batch = dispatcher.run_all(requests).await;
//!     for request in batch.iter() {
//!         match request.outcome() {
//!             Some(Outcome::Found(_)) => println!("{}: pwned", request.url()),
//!             Some(Outcome::NotFound) => println!("{}: clean", request.url()),
//!             other => println!("{}: {:?}", request.url(), other),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Outcomes
//!
//! - **Found**: the service returned a record (parsed JSON, with typed
//!   decoding via [`Outcome::breaches`] and friends)
//! - **NotFound**: the account or domain is not in any breach
//! - **InvalidParameter**: the service does not recognise the value
//! - **TransportError**: network, status, parse or deadline failure

pub use classify::{classify, UNKNOWN_BREACH_NAME};
pub use config::{
    load_env_config, parse_duration_string, ConfigManager, DefaultsConfig, EnvConfig, FileConfig,
    ServiceConfig,
};
pub use dispatcher::Dispatcher;
pub use error::HibpError;
pub use models::Breach;
pub use query::QueryBuilder;
pub use transport::{HttpTransport, RawResponse, Transport};
pub use types::{
    BatchResult, DispatchConfig, Outcome, QueryKind, QueryReport, QueryRequest,
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, MAX_CONCURRENCY,
};
pub use utils::{read_parameters_from_file, validate_account, validate_domain};

mod classify;
mod config;
mod dispatcher;
mod error;
mod models;
mod query;
mod transport;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, HibpError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
