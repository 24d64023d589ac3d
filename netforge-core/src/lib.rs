//! # netforge-core
//!
//! Device model, topology inference and network analysis.
//!
//! Everything in this crate is synchronous and side-effect free apart from
//! reading device files: the same device list always yields the same
//! topology, and the same topology always yields the same report.
//!
//! ### Key Submodules:
//! - `model`: permissive device and interface records
//! - `topology`: subnet-based link inference, tiers and graph helpers
//! - `analysis`: utilization estimate, resilience findings and recommendations

pub mod analysis;
pub mod error;
pub mod model;
pub mod topology;

pub mod prelude {
    pub use crate::analysis::*;
    pub use crate::error::*;
    pub use crate::model::*;
    pub use crate::topology::*;
}

pub use error::CoreError;
