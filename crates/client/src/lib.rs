#![warn(missing_docs)]
//! Transport glue between the dashboard server and the wire layer in `mcdash-net`.
//!
//! [`DashboardClient`] speaks the HTTP endpoints (status, player detail, login),
//! [`StatusPoller`] turns the status endpoint into a stream of reports, and
//! [`HubConnection`] drives the live admin socket.

pub mod http;
pub mod hub;
pub mod poller;
pub mod ws;

pub use http::{DashboardClient, LoginError};
pub use hub::{HubConfig, HubConnection, HubError, HubHandle, HubSnapshot, HubUpdate};
pub use poller::{StatusPoller, StatusReport, StatusSource};
