use anyhow::{anyhow, Result};
use clap::ArgMatches;

use crate::error::AnalysisError;
use crate::mna::StampingRule;

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub input_file: Option<String>,
    pub output_file: Option<String>,
    /// Instants to analyse; empty means prompt on stdin
    pub times: Vec<f64>,
    pub phasor_omega: Option<f64>,
    pub stamping: StampingRule,
    pub output_format: OutputFormat,
    pub parallel: bool,
    pub verbose_level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl CliArgs {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let input_file = matches.get_one::<String>("input").cloned();
        let output_file = matches.get_one::<String>("output").cloned();
        let verbose_level = matches.get_count("verbose");
        let parallel = !matches.get_flag("serial");

        let output_format = match matches.get_one::<String>("format").map(String::as_str) {
            Some("csv") | None => OutputFormat::Csv,
            Some("json") => OutputFormat::Json,
            Some(other) => return Err(anyhow!("Invalid output format: {}", other)),
        };

        let stamping = match matches.get_one::<String>("stamping").map(String::as_str) {
            Some("above-ground") | None => StampingRule::AboveGround,
            Some("non-ground") => StampingRule::NonGround,
            Some(other) => return Err(anyhow!("Invalid stamping rule: {}", other)),
        };

        let times = match matches.get_many::<String>("time") {
            Some(values) => values
                .map(|v| parse_time_value(v))
                .collect::<Result<Vec<_>, AnalysisError>>()?,
            None => Vec::new(),
        };

        let phasor_omega = matches
            .get_one::<String>("phasor-freq")
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|_| AnalysisError::InvalidInput(format!("invalid angular frequency `{}`", v)))
            })
            .transpose()?;

        if output_file.is_some() && times.is_empty() {
            return Err(anyhow!("Exporting results requires at least one --time value"));
        }

        Ok(CliArgs {
            input_file,
            output_file,
            times,
            phasor_omega,
            stamping,
            output_format,
            parallel,
            verbose_level,
        })
    }
}

/// Parse time value with unit (e.g., "1ns", "1.5ms", "10us")
pub fn parse_time_value(value: &str) -> Result<f64, AnalysisError> {
    let value = value.trim().to_lowercase();

    let (number, multiplier) = if let Some(num_str) = value.strip_suffix("fs") {
        (num_str, 1e-15)
    } else if let Some(num_str) = value.strip_suffix("ps") {
        (num_str, 1e-12)
    } else if let Some(num_str) = value.strip_suffix("ns") {
        (num_str, 1e-9)
    } else if let Some(num_str) = value.strip_suffix("us") {
        (num_str, 1e-6)
    } else if let Some(num_str) = value.strip_suffix("ms") {
        (num_str, 1e-3)
    } else if let Some(num_str) = value.strip_suffix('s') {
        (num_str, 1.0)
    } else {
        // Assume seconds if no unit specified
        (value.as_str(), 1.0)
    };

    match number.trim().parse::<f64>() {
        Ok(t) if t.is_finite() => Ok(t * multiplier),
        _ => Err(AnalysisError::InvalidInput(format!(
            "invalid time value `{}`",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_value() {
        assert_eq!(parse_time_value("1ns").unwrap(), 1e-9);
        assert!((parse_time_value("1.5us").unwrap() - 1.5e-6).abs() < 1e-18);
        assert_eq!(parse_time_value("10ms").unwrap(), 10e-3);
        assert_eq!(parse_time_value("1").unwrap(), 1.0);
        assert_eq!(parse_time_value(" 2.5s\n").unwrap(), 2.5);
    }

    #[test]
    fn test_parse_time_value_rejects_garbage() {
        for bad in ["", "abc", "1.2.3", "inf", "NaN", "5 ks"] {
            assert!(
                matches!(parse_time_value(bad), Err(AnalysisError::InvalidInput(_))),
                "{:?} accepted",
                bad
            );
        }
    }
}
