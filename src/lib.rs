pub mod client;
pub mod config;
pub mod cookie;
pub mod endpoint;
pub mod error;
pub mod headers;
pub mod html;
pub mod ids;
pub mod record;
pub mod server;
pub mod template;
pub mod transport;

pub use client::{ClientOptions, XServerClient};
pub use config::{RenewConfig, mask_credential};
pub use error::RenewError;
pub use ids::{UniqueId, VpsId};
pub use transport::{Transport, WreqTransport};
