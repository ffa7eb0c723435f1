use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Waveform of the single independent source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Constant level `V`
    Dc,
    /// Switched level `V * u(t)`
    Step,
    /// `V * sin(omega * t)`
    Sine { omega: f64 },
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Dc => "DC",
            SourceKind::Step => "STEP",
            SourceKind::Sine { .. } => "SINE",
        }
    }
}

/// The excitation driving the network. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Source {
    amplitude: f64,
    kind: SourceKind,
}

impl Source {
    pub fn new(amplitude: f64, kind: SourceKind) -> Self {
        Source { amplitude, kind }
    }

    pub fn dc(amplitude: f64) -> Self {
        Self::new(amplitude, SourceKind::Dc)
    }

    pub fn step(amplitude: f64) -> Self {
        Self::new(amplitude, SourceKind::Step)
    }

    pub fn sine(amplitude: f64, omega: f64) -> Self {
        Self::new(amplitude, SourceKind::Sine { omega })
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Angular frequency, only meaningful for sine sources
    pub fn frequency(&self) -> Option<f64> {
        match self.kind {
            SourceKind::Sine { omega } => Some(omega),
            _ => None,
        }
    }

    /// One-sided Laplace transform of the source waveform evaluated at `s`.
    ///
    /// DC and step share `A/s`; a sine maps to `A*w / (s^2 + w^2)`.
    pub fn laplace_transform(&self, s: Complex64) -> Complex64 {
        match self.kind {
            SourceKind::Dc | SourceKind::Step => Complex64::new(self.amplitude, 0.0) / s,
            SourceKind::Sine { omega } => {
                Complex64::new(self.amplitude * omega, 0.0) / (s * s + omega * omega)
            }
        }
    }

    /// Human readable time-domain form, for display only
    pub fn time_domain_expression(&self) -> String {
        match self.kind {
            SourceKind::Dc => format!("{:.6}V", self.amplitude),
            SourceKind::Step => format!("{:.6}V * u(t)", self.amplitude),
            SourceKind::Sine { omega } => {
                format!("{:.6}V * sin({:.6}t)", self.amplitude, omega)
            }
        }
    }
}
