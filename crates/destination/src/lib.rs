//! The destination plugin contract and the concrete backends the
//! scheduler can route batches to: stdout, pooled syslog (also used for
//! Loggly/LogDNA presets), Datadog StatsD, and CloudWatch Logs/Kinesis
//! adapters over a caller-supplied shipper.

mod cloudwatch;
mod datadog;
mod kinesis;
mod registry;
mod ship;
mod stdout;
mod syslog_dest;
mod traits;

pub use cloudwatch::CloudWatchLogsDestination;
pub use datadog::DatadogStatsdDestination;
pub use kinesis::KinesisDestination;
pub use registry::Registry;
pub use ship::{BatchShipper, ShipError};
pub use stdout::StdoutDestination;
pub use syslog_dest::{PooledSyslogDestination, SyslogDestinationConfig};
pub use traits::{Destination, DestinationError, Writer};
