// boycivenga-api: async client for the UniFi controller's legacy REST API.
//
// Only the surface the reconciliation tool needs: session auth, platform
// detection and `rest/networkconf` CRUD.

pub mod auth;
pub mod error;
pub mod legacy;
pub mod transport;

pub use auth::ControllerPlatform;
pub use error::Error;
pub use legacy::LegacyClient;
pub use legacy::models::LegacyNetworkConf;
pub use transport::{TlsMode, TransportConfig};
