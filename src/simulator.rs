use anyhow::{Context, Result};
use log::info;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::time::Instant;

use crate::circuit::{Circuit, Element};
use crate::cli::{parse_time_value, OutputFormat};
use crate::currents::{self, BranchCurrent};
use crate::error::AnalysisError;
use crate::mna::{system_size, AdmittanceSystem, SOURCE_SCALE};
use crate::output;
use crate::solver::{LinearSolver, SolverConfig};
use crate::transform::{BromwichConfig, FrequencyResponse, InverseLaplace};

/// Node voltage in the s-domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePhasor {
    pub node: usize,
    pub re: f64,
    pub im: f64,
}

impl NodePhasor {
    pub fn value(&self) -> Complex64 {
        Complex64::new(self.re, self.im)
    }
}

/// Time-domain voltages and resistor currents at one instant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeDomainReport {
    pub time: f64,
    /// Indexed by node; the ground entry is always zero
    pub voltages: Vec<f64>,
    pub currents: Vec<BranchCurrent>,
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub solver_config: SolverConfig,
    pub bromwich: BromwichConfig,
    /// Point at which the source transform is displayed
    pub probe_s: Complex64,
    /// Point at which node phasors are solved
    pub phasor_s: Complex64,
    pub source_scale: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            solver_config: SolverConfig::default(),
            bromwich: BromwichConfig::default(),
            probe_s: Complex64::new(1.0, 0.0),
            phasor_s: Complex64::new(0.0, 10.0),
            source_scale: SOURCE_SCALE,
        }
    }
}

/// Analysis front end over one circuit
pub struct Simulator {
    circuit: Circuit,
    solver: LinearSolver,
    engine: InverseLaplace,
    config: SimulatorConfig,
}

impl Simulator {
    /// Create a new simulator with default configuration
    pub fn new(circuit: Circuit) -> Self {
        Self::with_config(circuit, SimulatorConfig::default())
    }

    /// Create a new simulator with custom configuration
    pub fn with_config(circuit: Circuit, config: SimulatorConfig) -> Self {
        let solver = LinearSolver::with_config(config.solver_config.clone());
        let engine = InverseLaplace::new(config.bromwich.clone(), solver.clone())
            .with_source_scale(config.source_scale);
        Simulator {
            circuit,
            solver,
            engine,
            config,
        }
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn source_expression(&self) -> String {
        self.circuit.source().time_domain_expression()
    }

    pub fn list_components(&self) -> Vec<Element> {
        self.circuit.components()
    }

    /// Source transform at the display probe point
    pub fn source_probe(&self) -> Complex64 {
        self.circuit.source().laplace_transform(self.config.probe_s)
    }

    /// Solve the nodal system at `s`, one entry per matrix unknown
    pub fn phasor_voltages(&self, s: Complex64) -> Result<Vec<NodePhasor>, AnalysisError> {
        let system = AdmittanceSystem::assemble_scaled(&self.circuit, s, self.config.source_scale);
        let solution = self.solver.solve(&system.matrix, &system.rhs, s)?;

        let rule = self.circuit.stamping();
        let ground = self.circuit.ground_node();
        let node_count = self.circuit.node_count();

        let mut phasors = Vec::with_capacity(system_size(&self.circuit));
        for node in 0..node_count {
            if let Some(row) = rule.unknown_index(node, ground, node_count) {
                phasors.push(NodePhasor {
                    node,
                    re: solution[row].re,
                    im: solution[row].im,
                });
            }
        }
        Ok(phasors)
    }

    /// Node phasors at the configured analysis frequency
    pub fn default_phasors(&self) -> Result<Vec<NodePhasor>, AnalysisError> {
        self.phasor_voltages(self.config.phasor_s)
    }

    pub fn frequency_response(&self) -> Result<FrequencyResponse, AnalysisError> {
        self.engine.frequency_response(&self.circuit)
    }

    pub fn time_domain_voltages(&self, t: f64) -> Result<Vec<f64>, AnalysisError> {
        self.engine.voltages_at(&self.circuit, t)
    }

    pub fn branch_currents(&self, voltages: &[f64]) -> Result<Vec<BranchCurrent>, AnalysisError> {
        currents::branch_currents(&self.circuit, voltages)
    }

    /// Voltages and resistor currents at a single instant
    pub fn analyze_at(&self, t: f64) -> Result<TimeDomainReport, AnalysisError> {
        Ok(self.analyze_at_times(&[t])?.remove(0))
    }

    /// Reports for several instants, sharing one pass over the contour
    pub fn analyze_at_times(&self, times: &[f64]) -> Result<Vec<TimeDomainReport>, AnalysisError> {
        let start_time = Instant::now();
        let response = self.frequency_response()?;

        let reports = times
            .iter()
            .map(|&time| -> Result<TimeDomainReport, AnalysisError> {
                let voltages = response.voltages_at(time)?;
                let currents = self.branch_currents(&voltages)?;
                Ok(TimeDomainReport {
                    time,
                    voltages,
                    currents,
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;

        info!(
            "Time-domain analysis of {} instant(s) completed in {:.3}ms",
            times.len(),
            start_time.elapsed().as_secs_f64() * 1000.0
        );
        Ok(reports)
    }

    /// Console analysis sequence: circuit description, s-domain source probe,
    /// phasor solution, then one time value read from `input` and the
    /// time-domain report for it.
    pub fn analyze<R: BufRead, W: Write>(&self, input: &mut R, out: &mut W) -> Result<TimeDomainReport> {
        writeln!(out, "\nCircuit Analysis")?;
        writeln!(out, "================")?;

        writeln!(out, "\n1. Time Domain Circuit:")?;
        writeln!(out, "Input: {}", self.source_expression())?;
        output::write_components(out, &self.list_components())?;

        writeln!(out, "\n2. Frequency Domain (s-domain) Circuit:")?;
        writeln!(out, "Source (Laplace Transform): {}", output::format_complex(self.source_probe()))?;

        writeln!(out, "\n3. Node Voltage Solutions (Frequency Domain):")?;
        output::write_phasors(out, &self.default_phasors()?)?;

        writeln!(out, "\n4. Time-Domain Voltages and Currents:")?;
        write!(out, "Enter the time value for time-domain analysis (in seconds): ")?;
        out.flush()?;

        let mut line = String::new();
        input
            .read_line(&mut line)
            .context("Failed to read time value")?;
        let t = parse_time_value(&line)?;

        let report = self.analyze_at(t)?;
        output::write_report(out, &report)?;
        Ok(report)
    }

    /// Export time-domain reports to file
    pub fn export_results(
        &self,
        reports: &[TimeDomainReport],
        filename: &str,
        format: OutputFormat,
    ) -> Result<()> {
        match format {
            OutputFormat::Csv => output::export_csv(reports, filename),
            OutputFormat::Json => output::export_json(reports, filename),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Source;

    fn fast_config() -> SimulatorConfig {
        SimulatorConfig {
            bromwich: BromwichConfig {
                samples: 200,
                parallel: false,
                ..BromwichConfig::default()
            },
            ..SimulatorConfig::default()
        }
    }

    fn divider() -> Circuit {
        let mut circuit = Circuit::new(Source::dc(10.0), 1, 0, 3).unwrap();
        circuit.add_resistor(1, 2, 1000.0).unwrap();
        circuit.add_resistor(2, 0, 1000.0).unwrap();
        circuit
    }

    #[test]
    fn test_phasor_voltages() {
        let mut circuit = Circuit::new(Source::dc(10.0), 1, 0, 2).unwrap();
        circuit.add_resistor(1, 0, 1000.0).unwrap();
        let simulator = Simulator::new(circuit);

        let phasors = simulator.default_phasors().unwrap();
        assert_eq!(phasors.len(), 1);
        assert_eq!(phasors[0].node, 1);
        // 1000 * (10 / 10i) / 1e-6 = -1e9 i
        assert!((phasors[0].value() - Complex64::new(0.0, -1e9)).norm() < 1e-3);
    }

    #[test]
    fn test_source_probe() {
        let simulator = Simulator::new(divider());
        assert!((simulator.source_probe() - Complex64::new(10.0, 0.0)).norm() < 1e-12);
        assert_eq!(simulator.source_expression(), "10.000000V");
        assert_eq!(simulator.list_components().len(), 2);
    }

    #[test]
    fn test_divider_halves_voltage() {
        let simulator = Simulator::with_config(divider(), fast_config());
        let report = simulator.analyze_at(1.0).unwrap();

        assert_eq!(report.voltages.len(), 3);
        assert_eq!(report.voltages[0], 0.0);
        let ratio = report.voltages[2] / report.voltages[1];
        assert!((ratio - 0.5).abs() < 1e-9);
        assert_eq!(report.currents.len(), 2);
    }

    #[test]
    fn test_analyze_reads_time_from_input() {
        let simulator = Simulator::with_config(divider(), fast_config());
        let mut input = "2.5\n".as_bytes();
        let mut out = Vec::new();

        let report = simulator.analyze(&mut input, &mut out).unwrap();
        assert_eq!(report.time, 2.5);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Input: 10.000000V"));
        assert!(text.contains("R12 = 1000 Ω"));
        assert!(text.contains("V1(s) = "));
        assert!(text.contains("V0(t) = 0.0000 V"));
    }

    #[test]
    fn test_analyze_rejects_bad_time() {
        let simulator = Simulator::with_config(divider(), fast_config());
        let mut input = "soon\n".as_bytes();
        let mut out = Vec::new();

        let err = simulator.analyze(&mut input, &mut out).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::InvalidInput(_))
        ));
    }
}
