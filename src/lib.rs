pub mod circuit;
pub mod cli;
pub mod currents;
pub mod error;
pub mod mna;
pub mod output;
pub mod parser;
pub mod simulator;
pub mod solver;
pub mod source;
pub mod transform;

// Re-export commonly used types
pub use circuit::{Circuit, Element, ElementKind, Node};
pub use error::AnalysisError;
pub use mna::{AdmittanceSystem, StampingRule};
pub use parser::NetlistParser;
pub use simulator::{Simulator, TimeDomainReport};
pub use source::{Source, SourceKind};
pub use transform::{BromwichConfig, InverseLaplace};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
