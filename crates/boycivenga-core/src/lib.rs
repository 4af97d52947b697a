//! Desired-state reconciliation of UniFi networks against an inventory
//! source of truth.
//!
//! The crate owns the domain model and the reconcile/apply logic for the
//! boycivenga workspace:
//!
//! - **Desired state** ([`desired`]): joins inventory VLANs and prefixes
//!   ([`IntentDocument`]) into an ordered list of [`Network`]s with derived
//!   gateway and DHCP pool.
//!
//! - **[`reconcile()`]**: pure three-way diff of desired, recorded and
//!   actual networks into a [`DiffResult`] (create / update / delete / drift).
//!
//! - **[`apply()`](apply::apply)**: pushes desired networks through a
//!   [`NetworkController`], capturing per-network failures into an
//!   [`ApplyReport`]; [`plan()`](plan::plan) is its read-only counterpart.
//!
//! - **[`StateStore`]**: the recorded-state JSON written after each apply.
//!
//! - **[`UnifiController`]**: the `NetworkController` implementation over
//!   `boycivenga-api`, with platform detection, session login and retries.

pub mod apply;
pub mod config;
pub mod controller;
pub mod convert;
pub mod desired;
pub mod error;
pub mod model;
pub mod plan;
pub mod reconcile;
pub mod state;

// ── Primary re-exports ──────────────────────────────────────────────
pub use apply::{ApplyAction, ApplyError, ApplyFailure, ApplyOptions, ApplyReport};
pub use config::{AuthCredentials, ControllerConfig, ControllerPlatform, RetryPolicy, TlsVerification};
pub use controller::{NetworkController, UnifiController};
pub use desired::build_desired_state;
pub use error::CoreError;
pub use model::{IntentDocument, ManagedField, ManagedFields, Network, Prefix, Vlan};
pub use plan::{PlanOptions, PlanStatus};
pub use reconcile::{DiffResult, DiffSummary, DriftEntry, NetworkChange, reconcile};
pub use state::{RecordedState, StateStore};
