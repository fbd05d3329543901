//! Conflict-free replicated data type (CRDT) foundation.
//!
//! Implements a closed set of CRDTs for eventual consistency in
//! distributed systems:
//! - State-based merge (CvRDT) and operation-based apply (CmRDT), both
//!   required to converge for every kind.
//! - Vector clocks for causality tracking between replicas.
//! - Deterministic, automatic conflict resolution — no coordination,
//!   no consensus round-trip.
//!
//! Key properties guaranteed by every kind:
//! - Associativity: `(a ⊔ b) ⊔ c = a ⊔ (b ⊔ c)`
//! - Commutativity: `a ⊔ b = b ⊔ a`
//! - Idempotence: `a ⊔ a = a`
//! - Convergence: replicas that have seen the same operations agree
//!
//! Transport, storage, and rendering are explicitly out of scope: this
//! crate consumes and produces immutable envelopes/snapshots and never
//! performs I/O.

pub mod envelope;
pub mod error;
pub mod gcounter;
pub mod gset;
pub mod header;
pub mod ids;
pub mod instance;
pub mod kind;
pub mod lww;
pub mod orset;
pub mod pncounter;
pub mod registry;
pub mod rga;
pub mod tag;
pub mod vector_clock;
pub mod visualization;
pub mod wire;

pub use envelope::{OperationEnvelope, OperationPayload};
pub use error::{CrdtError, CrdtResult};
pub use gcounter::{GCounterInstance, GCounterOp, GCounterState};
pub use gset::{GSetInstance, GSetOp, GSetState};
pub use header::{InstanceHeader, OperationOutcome};
pub use ids::{CrdtId, ReplicaId};
pub use instance::CrdtInstance;
pub use kind::CrdtKind;
pub use lww::{LwwEntry, LwwRegisterInstance, LwwRegisterOp, LwwRegisterState};
pub use orset::{OrSetInstance, OrSetOp, OrSetState};
pub use pncounter::{PnCounterInstance, PnCounterOp, PnCounterState};
pub use registry::Registry;
pub use rga::{ElementId, RgaInstance, RgaOp, RgaState};
pub use tag::generate_unique_tag;
pub use vector_clock::{ClockOrdering, VectorClock};
pub use visualization::{DebugInfo, VisualizationData};
pub use wire::{OperationRecord, StateSnapshot};
