use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::error::{AnalysisError, Result};

/// Current through one resistor, positive from `node_a` to `node_b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchCurrent {
    pub node_a: usize,
    pub node_b: usize,
    pub resistance: f64,
    pub current: f64,
}

impl BranchCurrent {
    pub fn name(&self) -> String {
        format!("R{}{}", self.node_a, self.node_b)
    }
}

/// Resistor currents from time-domain node voltages.
///
/// Each resistor is reported once, from its lower-indexed endpoint, as
/// `(V[a] - V[b]) / R`. Capacitor and inductor currents are not derived.
pub fn branch_currents(circuit: &Circuit, voltages: &[f64]) -> Result<Vec<BranchCurrent>> {
    if voltages.len() != circuit.node_count() {
        return Err(AnalysisError::DimensionMismatch {
            expected: circuit.node_count(),
            actual: voltages.len(),
        });
    }

    let mut currents = Vec::new();
    for (a, node) in circuit.nodes().iter().enumerate() {
        for &(b, resistance) in &node.resistors {
            if b > a {
                currents.push(BranchCurrent {
                    node_a: a,
                    node_b: b,
                    resistance,
                    current: (voltages[a] - voltages[b]) / resistance,
                });
            }
        }
    }
    Ok(currents)
}
