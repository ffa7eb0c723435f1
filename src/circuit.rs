use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::mna::StampingRule;
use crate::source::Source;

/// Kinds of passive two-terminal elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElementKind {
    Resistor,
    Capacitor,
    Inductor,
}

impl ElementKind {
    /// Designator prefix used in component listings
    pub fn prefix(&self) -> char {
        match self {
            ElementKind::Resistor => 'R',
            ElementKind::Capacitor => 'C',
            ElementKind::Inductor => 'L',
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            ElementKind::Resistor => "Ω",
            ElementKind::Capacitor => "F",
            ElementKind::Inductor => "H",
        }
    }
}

/// Incident-element record: (neighbour node, component value)
pub type Incidence = (usize, f64);

/// Per-node adjacency, one ordered list per element kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub resistors: Vec<Incidence>,
    pub capacitors: Vec<Incidence>,
    pub inductors: Vec<Incidence>,
}

impl Node {
    pub fn incident(&self, kind: ElementKind) -> &[Incidence] {
        match kind {
            ElementKind::Resistor => &self.resistors,
            ElementKind::Capacitor => &self.capacitors,
            ElementKind::Inductor => &self.inductors,
        }
    }

    fn incident_mut(&mut self, kind: ElementKind) -> &mut Vec<Incidence> {
        match kind {
            ElementKind::Resistor => &mut self.resistors,
            ElementKind::Capacitor => &mut self.capacitors,
            ElementKind::Inductor => &mut self.inductors,
        }
    }
}

/// One element as seen from its lower-indexed endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub kind: ElementKind,
    pub node_a: usize,
    pub node_b: usize,
    pub value: f64,
}

impl Element {
    /// Designator built from the endpoints, e.g. `R10`
    pub fn name(&self) -> String {
        format!("{}{}{}", self.kind.prefix(), self.node_a, self.node_b)
    }
}

/// Linear RLC network driven by a single source.
///
/// Topology lives in an arena of [`Node`]s addressed by index. Every element is
/// recorded symmetrically in both endpoints' lists with the same value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Circuit {
    source: Source,
    source_node: usize,
    ground_node: usize,
    nodes: Vec<Node>,
    stamping: StampingRule,
}

impl Circuit {
    pub fn new(
        source: Source,
        source_node: usize,
        ground_node: usize,
        node_count: usize,
    ) -> Result<Self> {
        for index in [source_node, ground_node] {
            if index >= node_count {
                return Err(AnalysisError::InvalidNodeIndex { index, node_count });
            }
        }

        Ok(Circuit {
            source,
            source_node,
            ground_node,
            nodes: vec![Node::default(); node_count],
            stamping: StampingRule::default(),
        })
    }

    /// Select how neighbours are coupled during admittance assembly
    pub fn with_stamping(mut self, stamping: StampingRule) -> Self {
        self.stamping = stamping;
        self
    }

    pub fn add_resistor(&mut self, n1: usize, n2: usize, resistance: f64) -> Result<()> {
        self.add_element(ElementKind::Resistor, n1, n2, resistance)
    }

    pub fn add_capacitor(&mut self, n1: usize, n2: usize, capacitance: f64) -> Result<()> {
        self.add_element(ElementKind::Capacitor, n1, n2, capacitance)
    }

    pub fn add_inductor(&mut self, n1: usize, n2: usize, inductance: f64) -> Result<()> {
        self.add_element(ElementKind::Inductor, n1, n2, inductance)
    }

    /// Append the element to both endpoints. Repeated pairs stack in parallel.
    pub fn add_element(&mut self, kind: ElementKind, n1: usize, n2: usize, value: f64) -> Result<()> {
        self.check_index(n1)?;
        self.check_index(n2)?;

        self.nodes[n1].incident_mut(kind).push((n2, value));
        self.nodes[n2].incident_mut(kind).push((n1, value));
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.nodes.len() {
            Ok(())
        } else {
            Err(AnalysisError::InvalidNodeIndex {
                index,
                node_count: self.nodes.len(),
            })
        }
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn source_node(&self) -> usize {
        self.source_node
    }

    pub fn ground_node(&self) -> usize {
        self.ground_node
    }

    pub fn stamping(&self) -> StampingRule {
        self.stamping
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Result<&Node> {
        self.check_index(index)?;
        Ok(&self.nodes[index])
    }

    /// Every element once, reported from its lower-indexed endpoint,
    /// resistors before capacitors before inductors at each node.
    pub fn components(&self) -> Vec<Element> {
        let mut elements = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            for kind in [ElementKind::Resistor, ElementKind::Capacitor, ElementKind::Inductor] {
                for &(j, value) in node.incident(kind) {
                    if i < j {
                        elements.push(Element {
                            kind,
                            node_a: i,
                            node_b: j,
                            value,
                        });
                    }
                }
            }
        }
        elements
    }

    /// Print circuit summary
    pub fn print_summary(&self) {
        println!("Nodes: {}", self.nodes.len());
        println!("Ground node: {}", self.ground_node);
        println!("Source node: {} ({})", self.source_node, self.source.kind().label());

        let elements = self.components();
        for kind in [ElementKind::Resistor, ElementKind::Capacitor, ElementKind::Inductor] {
            let count = elements.iter().filter(|e| e.kind == kind).count();
            if count > 0 {
                println!("  {:?}s: {}", kind, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> Circuit {
        Circuit::new(Source::dc(10.0), 1, 0, 3).unwrap()
    }

    #[test]
    fn test_symmetric_storage() {
        let mut circuit = demo();
        circuit.add_resistor(1, 2, 1000.0).unwrap();
        circuit.add_capacitor(2, 0, 1e-6).unwrap();
        circuit.add_inductor(1, 0, 0.01).unwrap();

        assert_eq!(circuit.node(1).unwrap().resistors, vec![(2, 1000.0)]);
        assert_eq!(circuit.node(2).unwrap().resistors, vec![(1, 1000.0)]);
        assert_eq!(circuit.node(2).unwrap().capacitors, vec![(0, 1e-6)]);
        assert_eq!(circuit.node(0).unwrap().capacitors, vec![(2, 1e-6)]);
        assert_eq!(circuit.node(0).unwrap().inductors, vec![(1, 0.01)]);
    }

    #[test]
    fn test_duplicate_elements_are_kept() {
        let mut circuit = demo();
        circuit.add_resistor(1, 0, 1000.0).unwrap();
        circuit.add_resistor(1, 0, 1000.0).unwrap();
        assert_eq!(circuit.node(1).unwrap().resistors.len(), 2);
        assert_eq!(circuit.components().len(), 2);
    }

    #[test]
    fn test_invalid_node_index() {
        let mut circuit = demo();
        let err = circuit.add_resistor(1, 3, 1.0).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::InvalidNodeIndex { index: 3, node_count: 3 }
        ));
        assert!(circuit.node(1).unwrap().resistors.is_empty());

        assert!(Circuit::new(Source::dc(1.0), 2, 0, 2).is_err());
        assert!(Circuit::new(Source::dc(1.0), 0, 5, 2).is_err());
    }

    #[test]
    fn test_component_listing() {
        let mut circuit = demo();
        circuit.add_resistor(1, 0, 1000.0).unwrap();
        circuit.add_capacitor(1, 2, 1e-6).unwrap();
        circuit.add_inductor(2, 0, 0.01).unwrap();

        let names: Vec<String> = circuit.components().iter().map(Element::name).collect();
        assert_eq!(names, vec!["R01", "L02", "C12"]);
    }
}
