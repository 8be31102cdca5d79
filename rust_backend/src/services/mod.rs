//! External collaborators of the scheduler.
//!
//! This module contains the interfaces the scheduling loop consumes but does
//! not own: horizon geometry and alert delivery, together with the concrete
//! implementations the CLI wires up from configuration.

pub mod alerts;
pub mod horizon;

pub use alerts::{
    AlertRecord, AlertSink, AlertSinkKind, JsonLinesAlertSink, LogAlertSink, NullAlertSink,
};
pub use horizon::{CachedHorizon, FixedHorizon, HorizonService, NightBounds, SiderealHorizon};
