//! Numerical inverse Laplace transform along a vertical Bromwich contour.
//!
//! The contour `Re(s) = sigma` is sampled at `omega_k = omega_start + k * step`
//! for `k in 0..samples` and the inversion integral
//! `(1 / 2 pi i) * integral F(s) e^(st) ds` is approximated by the rectangular
//! rule over that finite window:
//!
//! ```text
//! f(t) ~= Re( sum_k F(s_k) e^(s_k t) * i*step ) / (2 pi)
//! ```
//!
//! The window is truncated at `omega_start + samples * step`, the offset is not
//! adapted to the pole locations and the step is never refined.

use std::f64::consts::PI;

use log::{debug, info};
use nalgebra::DVector;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::circuit::Circuit;
use crate::error::{AnalysisError, Result};
use crate::mna::{AdmittanceSystem, SOURCE_SCALE};
use crate::solver::LinearSolver;

/// Contour sampling parameters
#[derive(Debug, Clone)]
pub struct BromwichConfig {
    /// Real offset of the contour, to the right of the expected poles
    pub sigma: f64,
    /// Angular frequency of the first sample
    pub omega_start: f64,
    /// Spacing between samples, also the integration weight
    pub step: f64,
    pub samples: usize,
    /// Solve the contour samples on the rayon pool
    pub parallel: bool,
}

impl Default for BromwichConfig {
    fn default() -> Self {
        BromwichConfig {
            sigma: 0.1,
            omega_start: 0.1,
            step: 0.1,
            samples: 1000,
            parallel: true,
        }
    }
}

impl BromwichConfig {
    /// Complex frequency of sample `k`
    pub fn sample_point(&self, k: usize) -> Complex64 {
        Complex64::new(self.sigma, self.omega_start + k as f64 * self.step)
    }

    /// Highest angular frequency reached by the window
    pub fn truncation(&self) -> f64 {
        self.omega_start + (self.samples.saturating_sub(1)) as f64 * self.step
    }
}

/// Node-voltage transforms solved at every contour sample.
///
/// The admittance matrix depends only on `s` and the topology, so one solve per
/// sample serves every node and every requested time.
#[derive(Debug, Clone)]
pub struct FrequencyResponse {
    step: f64,
    ground_node: usize,
    /// Matrix unknown for each node, `None` for nodes without a row
    unknowns: Vec<Option<usize>>,
    samples: Vec<(Complex64, DVector<Complex64>)>,
}

impl FrequencyResponse {
    pub fn node_count(&self) -> usize {
        self.unknowns.len()
    }

    pub fn samples(&self) -> &[(Complex64, DVector<Complex64>)] {
        &self.samples
    }

    /// Time-domain voltage of one node at `t`. Ground is exactly zero.
    pub fn inverse_at(&self, node: usize, t: f64) -> Result<f64> {
        let unknown = *self
            .unknowns
            .get(node)
            .ok_or(AnalysisError::InvalidNodeIndex {
                index: node,
                node_count: self.unknowns.len(),
            })?;

        if node == self.ground_node {
            return Ok(0.0);
        }
        let row = match unknown {
            Some(row) => row,
            None => return Ok(0.0),
        };

        let weight = Complex64::new(0.0, self.step);
        let mut sum = Complex64::new(0.0, 0.0);
        for (s, voltages) in &self.samples {
            let fk = voltages[row] * (*s * t).exp();
            sum += fk * weight;
        }

        Ok(sum.re / (2.0 * PI))
    }

    /// Time-domain voltage of every node at `t`, indexed by node
    pub fn voltages_at(&self, t: f64) -> Result<Vec<f64>> {
        (0..self.node_count()).map(|node| self.inverse_at(node, t)).collect()
    }
}

/// Inverse-transform engine
#[derive(Debug, Clone, Default)]
pub struct InverseLaplace {
    config: BromwichConfig,
    solver: LinearSolver,
    source_scale: Option<f64>,
}

impl InverseLaplace {
    pub fn new(config: BromwichConfig, solver: LinearSolver) -> Self {
        InverseLaplace {
            config,
            solver,
            source_scale: None,
        }
    }

    /// Override the source-to-current scaling used during assembly
    pub fn with_source_scale(mut self, scale: f64) -> Self {
        self.source_scale = Some(scale);
        self
    }

    pub fn config(&self) -> &BromwichConfig {
        &self.config
    }

    /// Assemble and solve the network at every contour sample
    pub fn frequency_response(&self, circuit: &Circuit) -> Result<FrequencyResponse> {
        let scale = self.source_scale.unwrap_or(SOURCE_SCALE);
        let solve_sample = |k: usize| -> Result<(Complex64, DVector<Complex64>)> {
            let s = self.config.sample_point(k);
            let system = AdmittanceSystem::assemble_scaled(circuit, s, scale);
            let voltages = self.solver.solve(&system.matrix, &system.rhs, s)?;
            Ok((s, voltages))
        };

        debug!(
            "Sampling Bromwich contour: sigma={}, {} samples up to omega={}",
            self.config.sigma,
            self.config.samples,
            self.config.truncation()
        );

        // Indexed collection keeps sample order, so the later summation is
        // the same whether or not the solves ran in parallel.
        let samples = if self.config.parallel {
            (0..self.config.samples)
                .into_par_iter()
                .map(solve_sample)
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..self.config.samples)
                .map(solve_sample)
                .collect::<Result<Vec<_>>>()?
        };

        let rule = circuit.stamping();
        let unknowns = (0..circuit.node_count())
            .map(|node| rule.unknown_index(node, circuit.ground_node(), circuit.node_count()))
            .collect();

        Ok(FrequencyResponse {
            step: self.config.step,
            ground_node: circuit.ground_node(),
            unknowns,
            samples,
        })
    }

    /// Time-domain voltage of a single node at `t`
    pub fn inverse_at(&self, circuit: &Circuit, node: usize, t: f64) -> Result<f64> {
        if node >= circuit.node_count() {
            return Err(AnalysisError::InvalidNodeIndex {
                index: node,
                node_count: circuit.node_count(),
            });
        }
        if node == circuit.ground_node() {
            return Ok(0.0);
        }
        self.frequency_response(circuit)?.inverse_at(node, t)
    }

    /// Time-domain voltage of every node at `t`
    pub fn voltages_at(&self, circuit: &Circuit, t: f64) -> Result<Vec<f64>> {
        info!("Inverting node voltages at t = {}s", t);
        self.frequency_response(circuit)?.voltages_at(t)
    }
}
