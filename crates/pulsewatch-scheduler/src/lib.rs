//! pulsewatch-scheduler — the periodic monitoring loop and chat commands.
//!
//! Each cycle runs strictly in order: probe every service (concurrently),
//! publish the summary, alert on each unhealthy service, then sleep for the
//! update interval. A manual `status` command runs its own check in the
//! command task and leaves the loop's timer alone.

pub mod command;
pub mod monitor;

pub use command::{Command, CommandHandler};
pub use monitor::{CycleReport, Monitor};
