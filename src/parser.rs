use anyhow::{anyhow, Context, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::fs;

use crate::circuit::{Circuit, Element, ElementKind};
use crate::error::AnalysisError;
use crate::mna::StampingRule;
use crate::source::{Source, SourceKind};

lazy_static! {
    static ref ELEMENT_PATTERN: Regex = Regex::new(
        r"^([RCLrcl])(\w*)\s+(\d+)\s+(\d+)\s+(\S+)$"
    ).unwrap();

    static ref SOURCE_PATTERN: Regex = Regex::new(
        r"(?i)^V(\w*)\s+(\d+)\s+(\d+)\s+(?:(DC|STEP|SINE|SIN)\s+)?(\S+)(?:\s+(\S+))?$"
    ).unwrap();

    static ref DIRECTIVE_PATTERN: Regex = Regex::new(
        r"^\.(\w+)(?:\s+(.*))?$"
    ).unwrap();
}

/// Node indices must stay below this; the nodal matrix is dense
pub const MAX_NODES: usize = 1024;

/// Circuit description read from a netlist
#[derive(Debug, Clone)]
pub struct Netlist {
    pub title: Option<String>,
    pub source: Source,
    pub source_node: usize,
    pub ground_node: usize,
    pub elements: Vec<Element>,
}

impl Netlist {
    /// Number of nodes implied by the highest index used
    pub fn node_count(&self) -> usize {
        self.elements
            .iter()
            .flat_map(|e| [e.node_a, e.node_b])
            .chain([self.source_node, self.ground_node])
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    pub fn into_circuit(self, stamping: StampingRule) -> Result<Circuit> {
        let node_count = self.node_count();
        if node_count > MAX_NODES {
            return Err(AnalysisError::InvalidInput(format!(
                "netlist uses {} nodes, at most {} are supported",
                node_count, MAX_NODES
            ))
            .into());
        }

        let mut circuit = Circuit::new(
            self.source,
            self.source_node,
            self.ground_node,
            node_count,
        )?
        .with_stamping(stamping);

        for element in &self.elements {
            circuit.add_element(element.kind, element.node_a, element.node_b, element.value)?;
        }
        Ok(circuit)
    }
}

/// Line-oriented netlist reader.
///
/// ```text
/// * comment
/// V1 1 0 DC 10
/// R1 1 2 1k
/// C1 2 0 1u
/// L1 2 0 10m
/// .end
/// ```
///
/// `V name n+ n- [DC|STEP] amp` or `V name n+ n- SIN amp omega` declares the
/// single source, DC when no kind is given; `n-` is the ground node unless a
/// `.ground N` directive overrides it. Node indices run from 0 to
/// `MAX_NODES - 1`.
#[derive(Debug, Default)]
pub struct NetlistParser;

impl NetlistParser {
    pub fn new() -> Self {
        NetlistParser
    }

    pub fn parse_file(&self, filename: &str) -> Result<Netlist> {
        let content = fs::read_to_string(filename)
            .with_context(|| format!("Failed to read netlist '{}'", filename))?;

        self.parse_netlist(&content)
            .with_context(|| format!("Failed to parse netlist '{}'", filename))
    }

    pub fn parse_netlist(&self, content: &str) -> Result<Netlist> {
        let mut title = None;
        let mut source: Option<(Source, usize, usize)> = None;
        let mut ground_override = None;
        let mut elements = Vec::new();

        for (index, raw) in content.lines().enumerate() {
            let line_num = index + 1;
            let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");

            if line.is_empty() || line.starts_with('*') || line.starts_with(';') {
                continue;
            }

            if let Some(captures) = DIRECTIVE_PATTERN.captures(&line) {
                let name = captures[1].to_lowercase();
                let args = captures.get(2).map(|m| m.as_str().trim());
                match name.as_str() {
                    "end" => break,
                    "ground" => {
                        let arg = args.ok_or_else(|| invalid(line_num, "`.ground` needs a node index"))?;
                        ground_override = Some(parse_node(arg, line_num)?);
                    }
                    "title" => title = args.map(str::to_string),
                    _ => debug!("Ignoring directive on line {}: {}", line_num, line),
                }
                continue;
            }

            if let Some(captures) = SOURCE_PATTERN.captures(&line) {
                if source.is_some() {
                    return Err(invalid(line_num, "only one independent source is supported"));
                }
                let node_pos = parse_node(&captures[2], line_num)?;
                let node_neg = parse_node(&captures[3], line_num)?;
                let amplitude = parse_value(&captures[5], line_num)?;
                let omega = captures.get(6).map(|m| m.as_str());

                let kind_token = captures
                    .get(4)
                    .map_or_else(|| "DC".to_string(), |m| m.as_str().to_uppercase());

                let kind = match (kind_token.as_str(), omega) {
                    ("DC", None) => SourceKind::Dc,
                    ("STEP", None) => SourceKind::Step,
                    ("SIN" | "SINE", Some(omega)) => SourceKind::Sine {
                        omega: parse_value(omega, line_num)?,
                    },
                    ("SIN" | "SINE", None) => {
                        return Err(invalid(line_num, "sine source needs an angular frequency"))
                    }
                    (_, Some(_)) => {
                        return Err(invalid(line_num, "only sine sources take a frequency"))
                    }
                    (other, None) => {
                        return Err(invalid(line_num, &format!("unknown source kind {}", other)))
                    }
                };

                source = Some((Source::new(amplitude, kind), node_pos, node_neg));
                continue;
            }

            if let Some(captures) = ELEMENT_PATTERN.captures(&line) {
                let kind = match captures[1].to_ascii_uppercase().as_str() {
                    "R" => ElementKind::Resistor,
                    "C" => ElementKind::Capacitor,
                    _ => ElementKind::Inductor,
                };
                elements.push(Element {
                    kind,
                    node_a: parse_node(&captures[3], line_num)?,
                    node_b: parse_node(&captures[4], line_num)?,
                    value: parse_value(&captures[5], line_num)?,
                });
                continue;
            }

            return Err(invalid(line_num, &format!("unrecognised line `{}`", line)));
        }

        let (source, source_node, source_ground) =
            source.ok_or_else(|| anyhow!(AnalysisError::InvalidInput("netlist declares no source".into())))?;

        let netlist = Netlist {
            title,
            source,
            source_node,
            ground_node: ground_override.unwrap_or(source_ground),
            elements,
        };
        debug!(
            "Parsed netlist with {} elements over {} nodes",
            netlist.elements.len(),
            netlist.node_count()
        );
        Ok(netlist)
    }
}

fn invalid(line_num: usize, message: &str) -> anyhow::Error {
    AnalysisError::InvalidInput(format!("line {}: {}", line_num, message)).into()
}

fn parse_node(token: &str, line_num: usize) -> Result<usize> {
    match token.parse::<usize>() {
        Ok(node) if node < MAX_NODES => Ok(node),
        Ok(_) => Err(invalid(
            line_num,
            &format!("node index {} exceeds the limit of {}", token, MAX_NODES - 1),
        )),
        Err(_) => Err(invalid(line_num, &format!("invalid node index `{}`", token))),
    }
}

fn parse_value(token: &str, line_num: usize) -> Result<f64> {
    parse_value_with_unit(token)
        .ok_or_else(|| invalid(line_num, &format!("invalid value `{}`", token)))
}

/// Parse value with unit suffix (e.g., 1k, 1meg, 1m, 1u, 1n, 1p)
pub fn parse_value_with_unit(value_str: &str) -> Option<f64> {
    let value_str = value_str.trim().to_lowercase();

    let (number, multiplier) = if let Some(num_str) = value_str.strip_suffix("meg") {
        (num_str, 1e6)
    } else if let Some(num_str) = value_str.strip_suffix('g') {
        (num_str, 1e9)
    } else if let Some(num_str) = value_str.strip_suffix('k') {
        (num_str, 1e3)
    } else if let Some(num_str) = value_str.strip_suffix('m') {
        (num_str, 1e-3)
    } else if let Some(num_str) = value_str.strip_suffix('u') {
        (num_str, 1e-6)
    } else if let Some(num_str) = value_str.strip_suffix('n') {
        (num_str, 1e-9)
    } else if let Some(num_str) = value_str.strip_suffix('p') {
        (num_str, 1e-12)
    } else if let Some(num_str) = value_str.strip_suffix('f') {
        (num_str, 1e-15)
    } else {
        (value_str.as_str(), 1.0)
    };

    number.parse::<f64>().ok().map(|value| value * multiplier)
}
