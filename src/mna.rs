use log::debug;
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::circuit::{Circuit, ElementKind};

/// Scaling applied to the source transform when it is injected as a nodal current
pub const SOURCE_SCALE: f64 = 1e-6;

/// Rule deciding which neighbours of a node are coupled into the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StampingRule {
    /// Node `i` occupies row `i - 1`; a neighbour is coupled only when its index is
    /// greater than the ground index and the source is injected only when the
    /// source index is greater than ground. Neighbours below a non-zero ground
    /// are dropped.
    #[default]
    AboveGround,
    /// Ground is removed from the unknowns in index order and every other
    /// neighbour is coupled.
    NonGround,
}

impl StampingRule {
    /// Matrix row/column of `node`, or `None` when it carries no unknown
    pub fn unknown_index(&self, node: usize, ground: usize, node_count: usize) -> Option<usize> {
        if node >= node_count {
            return None;
        }
        match self {
            StampingRule::AboveGround => node.checked_sub(1),
            StampingRule::NonGround => match node.cmp(&ground) {
                std::cmp::Ordering::Less => Some(node),
                std::cmp::Ordering::Equal => None,
                std::cmp::Ordering::Greater => Some(node - 1),
            },
        }
    }

    /// Whether a non-ground neighbour contributes a coupling term
    fn couples(&self, neighbour: usize, ground: usize) -> bool {
        match self {
            StampingRule::AboveGround => neighbour > ground,
            StampingRule::NonGround => neighbour != ground,
        }
    }
}

/// Complex nodal system `Y(s) * V = I(s)` for one complex frequency
#[derive(Debug, Clone)]
pub struct AdmittanceSystem {
    /// Nodal admittance matrix Y
    pub matrix: DMatrix<Complex64>,
    /// Excitation vector I
    pub rhs: DVector<Complex64>,
    /// Complex frequency the system was assembled at
    pub s: Complex64,
}

impl AdmittanceSystem {
    /// Assemble with the default source scaling
    pub fn assemble(circuit: &Circuit, s: Complex64) -> Self {
        Self::assemble_scaled(circuit, s, SOURCE_SCALE)
    }

    pub fn assemble_scaled(circuit: &Circuit, s: Complex64, source_scale: f64) -> Self {
        let size = system_size(circuit);
        let mut matrix = DMatrix::from_element(size, size, Complex64::new(0.0, 0.0));
        let mut rhs = DVector::from_element(size, Complex64::new(0.0, 0.0));

        let rule = circuit.stamping();
        let ground = circuit.ground_node();
        let node_count = circuit.node_count();

        for (i, node) in circuit.nodes().iter().enumerate() {
            let row = match rule.unknown_index(i, ground, node_count) {
                Some(row) => row,
                None => continue,
            };

            for kind in [ElementKind::Resistor, ElementKind::Capacitor, ElementKind::Inductor] {
                for &(j, value) in node.incident(kind) {
                    let y = element_admittance(kind, value, s);
                    if j == ground {
                        matrix[(row, row)] += y;
                    } else if rule.couples(j, ground) {
                        if let Some(col) = rule.unknown_index(j, ground, node_count) {
                            matrix[(row, col)] -= y;
                            matrix[(row, row)] += y;
                        }
                    }
                }
            }
        }

        let source_node = circuit.source_node();
        if rule.couples(source_node, ground) {
            if let Some(row) = rule.unknown_index(source_node, ground, node_count) {
                rhs[row] = circuit.source().laplace_transform(s) / source_scale;
            }
        }

        debug!("Assembled {}x{} admittance system at s = {}", size, size, s);

        AdmittanceSystem { matrix, rhs, s }
    }

    pub fn size(&self) -> usize {
        self.rhs.len()
    }

    /// Check `Y[i,j] == Y[j,i]` for every off-diagonal pair
    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.size();
        for i in 0..n {
            for j in (i + 1)..n {
                if (self.matrix[(i, j)] - self.matrix[(j, i)]).norm() > tolerance {
                    return false;
                }
            }
        }
        true
    }
}

/// Number of unknowns: every node except one
pub fn system_size(circuit: &Circuit) -> usize {
    circuit.node_count().saturating_sub(1)
}

/// Admittance of a single element at `s`: 1/R, sC or 1/(sL)
pub fn element_admittance(kind: ElementKind, value: f64, s: Complex64) -> Complex64 {
    match kind {
        ElementKind::Resistor => Complex64::new(1.0 / value, 0.0),
        ElementKind::Capacitor => s * value,
        ElementKind::Inductor => Complex64::new(1.0, 0.0) / (s * value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn test_single_grounded_resistor() {
        let mut circuit = Circuit::new(Source::dc(10.0), 1, 0, 2).unwrap();
        circuit.add_resistor(1, 0, 1000.0).unwrap();

        let system = AdmittanceSystem::assemble(&circuit, c(1.0, 0.0));
        assert_eq!(system.size(), 1);
        assert!((system.matrix[(0, 0)] - c(1e-3, 0.0)).norm() < 1e-15);
        // 10/s / 1e-6 at s = 1
        assert!((system.rhs[0] - c(1e7, 0.0)).norm() < 1e-6);
    }

    #[test]
    fn test_rlc_stamps() {
        let mut circuit = Circuit::new(Source::dc(1.0), 1, 0, 3).unwrap();
        circuit.add_resistor(1, 2, 100.0).unwrap();
        circuit.add_capacitor(2, 0, 1e-3).unwrap();
        circuit.add_inductor(1, 0, 0.5).unwrap();

        let s = c(0.0, 10.0);
        let system = AdmittanceSystem::assemble(&circuit, s);

        let g = c(0.01, 0.0);
        let yc = s * 1e-3;
        let yl = c(1.0, 0.0) / (s * 0.5);
        assert!((system.matrix[(0, 0)] - (g + yl)).norm() < 1e-12);
        assert!((system.matrix[(0, 1)] + g).norm() < 1e-12);
        assert!((system.matrix[(1, 0)] + g).norm() < 1e-12);
        assert!((system.matrix[(1, 1)] - (g + yc)).norm() < 1e-12);
        assert_eq!(system.rhs[1], c(0.0, 0.0));
    }

    #[test]
    fn test_resistor_network_is_symmetric() {
        let mut circuit = Circuit::new(Source::step(5.0), 1, 0, 4).unwrap();
        circuit.add_resistor(1, 2, 10.0).unwrap();
        circuit.add_resistor(2, 3, 20.0).unwrap();
        circuit.add_resistor(1, 3, 30.0).unwrap();
        circuit.add_resistor(3, 0, 40.0).unwrap();

        for s in [c(0.1, 0.1), c(0.1, 50.0), c(2.0, -3.0)] {
            assert!(AdmittanceSystem::assemble(&circuit, s).is_symmetric(0.0));
        }
    }

    #[test]
    fn test_parallel_resistors_double_admittance() {
        let mut once = Circuit::new(Source::dc(1.0), 1, 0, 3).unwrap();
        once.add_resistor(1, 2, 50.0).unwrap();
        once.add_resistor(2, 0, 50.0).unwrap();

        let mut twice = once.clone();
        twice.add_resistor(1, 2, 50.0).unwrap();

        let s = c(0.1, 1.0);
        let a = AdmittanceSystem::assemble(&once, s);
        let b = AdmittanceSystem::assemble(&twice, s);
        assert!((b.matrix[(0, 1)] - a.matrix[(0, 1)] * 2.0).norm() < 1e-15);
        assert!((b.matrix[(0, 0)] - a.matrix[(0, 0)] * 2.0).norm() < 1e-15);
    }

    #[test]
    fn test_above_ground_rule_drops_lower_neighbours() {
        // Ground at 1; node 0 lies below it and node 2 above it.
        let mut circuit = Circuit::new(Source::dc(1.0), 2, 1, 3).unwrap();
        circuit.add_resistor(0, 2, 100.0).unwrap();
        circuit.add_resistor(2, 1, 100.0).unwrap();

        let system = AdmittanceSystem::assemble(&circuit, c(1.0, 0.0));
        // Node 2 sits in row 1 and only sees its grounded resistor.
        assert!((system.matrix[(1, 1)] - c(0.01, 0.0)).norm() < 1e-15);
        assert_eq!(system.matrix[(1, 0)], c(0.0, 0.0));
        // Node 0 has no row; row 0 belongs to the ground node itself and
        // still couples to node 2 above it.
        assert_eq!(system.matrix[(0, 0)], c(0.01, 0.0));
        assert_eq!(system.matrix[(0, 1)], c(-0.01, 0.0));
    }

    #[test]
    fn test_non_ground_rule_couples_lower_neighbours() {
        let mut circuit = Circuit::new(Source::dc(1.0), 2, 1, 3)
            .unwrap()
            .with_stamping(StampingRule::NonGround);
        circuit.add_resistor(0, 2, 100.0).unwrap();
        circuit.add_resistor(2, 1, 100.0).unwrap();

        let system = AdmittanceSystem::assemble(&circuit, c(1.0, 0.0));
        // Unknowns: node 0 -> 0, node 2 -> 1
        assert!((system.matrix[(0, 0)] - c(0.01, 0.0)).norm() < 1e-15);
        assert!((system.matrix[(0, 1)] + c(0.01, 0.0)).norm() < 1e-15);
        assert!((system.matrix[(1, 0)] + c(0.01, 0.0)).norm() < 1e-15);
        assert!((system.matrix[(1, 1)] - c(0.02, 0.0)).norm() < 1e-15);
        assert!(system.rhs[1].norm() > 0.0);
    }

    #[test]
    fn test_source_below_ground_gives_zero_excitation() {
        let mut circuit = Circuit::new(Source::dc(1.0), 0, 1, 2).unwrap();
        circuit.add_resistor(0, 1, 10.0).unwrap();
        let system = AdmittanceSystem::assemble(&circuit, c(1.0, 0.0));
        assert!(system.rhs.iter().all(|v| *v == c(0.0, 0.0)));
    }
}
