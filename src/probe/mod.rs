//! Local service detection.
//!
//! # Data Flow
//! ```text
//! ServiceProbe::detect
//!     → GET {host}:{port}{path} for each candidate path, in order
//!     → any HTTP response: something is listening, return the base URL
//!     → connection error / per-request timeout: try the next path
//!     → all candidates exhausted: None
//! ```
//!
//! # Design Decisions
//! - Any status code counts as "listening", including 4xx and 5xx
//! - The probe itself never fails on network errors; the caller wraps it in
//!   a timeout guard and a breaker for the overall budget
//! - Checks the cancel signal between candidates

pub mod local;

pub use local::{ProbeError, ServiceProbe};
