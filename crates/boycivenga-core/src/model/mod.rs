// ── Domain model ──

pub mod intent;
pub mod network;

pub use intent::{IntentDocument, Prefix, Vlan};
pub use network::{ManagedField, ManagedFields, Network};
