//! The five pluggable role contracts: gatherer, arranger, solver, filterer,
//! scaler.

pub mod arrange;
pub mod filter;
pub mod gather;
pub mod scale;
pub mod solve;

pub use arrange::Arranger;
pub use filter::{FilterStep, Filterer};
pub use gather::Gatherer;
pub use scale::{BoxedWait, Scaler};
pub use solve::Solver;
