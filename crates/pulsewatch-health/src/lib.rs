//! pulsewatch-health — HTTP health probing for monitored services.
//!
//! # Architecture
//!
//! ```text
//! HealthProber
//!   ├── check_one(name) → http_probe() → ServiceStatus
//!   └── check_all()
//!       ├── fan-out: one probe future per service (join_all)
//!       └── fan-in: write every result back into ServiceRegistry
//! ```
//!
//! There are no retries and no backoff inside a check. The scheduling loop
//! decides when the next check happens.

pub mod checker;
pub mod prober;

pub use checker::{build_client, http_probe};
pub use prober::{HealthProber, ProbeOutcome};
