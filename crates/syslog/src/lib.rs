//! Syslog framing and connection management: rendering messages as
//! syslog-formatted lines and writing them over a pooled connection to a
//! local socket or a remote TCP/TLS endpoint.

mod dialer;
mod template;
mod transport;
mod writer;

pub use dialer::{LocalDialer, RemoteDialer, RemoteTlsDialer};
pub use template::{Template, TemplateError, DEFAULT_TEMPLATE};
pub use transport::{dial_local, dial_remote, dial_remote_tls, Transport, TransportError};
pub use writer::SyslogWriter;
