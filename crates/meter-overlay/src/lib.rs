//! Overlay network boundary for meters.
//!
//! # Key Components
//!
//! - [`Broadcaster`]: submits an atomic envelope scoped to the meter topic
//! - [`LookupResolver`]: answers index queries with a tagged [`LookupAnswer`]
//! - [`DiscoveryClient`]: turns a lookup answer into decoded, verified meters
//! - [`MemoryLedger`]: in-process overlay implementing both boundaries
//!
//! HTTP implementations ([`HttpBroadcaster`], [`HttpLookupResolver`]) talk to a
//! remote overlay service; the in-memory ledger is used by tests and local runs.

pub mod broadcast;
pub mod discovery;
pub mod error;
pub mod lookup;
pub mod memory;

pub use broadcast::{
    BoxFuture, BroadcastResult, BroadcastStatus, Broadcaster, DynBroadcaster, HttpBroadcaster,
    MockBroadcaster, DEFAULT_TIMEOUT, METER_TOPIC,
};
pub use discovery::{Diagnostic, DiscoveryClient, DiscoveryFailure, DiscoveryPass};
pub use error::{OverlayError, OverlayResult};
pub use lookup::{
    DynLookupResolver, HttpLookupResolver, LookupAnswer, LookupOutput, LookupQuestion,
    LookupResolver, METER_SERVICE,
};
pub use memory::MemoryLedger;
