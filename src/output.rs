use anyhow::{Context, Result};
use csv::Writer;
use log::info;
use num_complex::Complex64;
use std::fs::File;
use std::io::Write;

use crate::circuit::Element;
use crate::simulator::{NodePhasor, TimeDomainReport};

/// `(re,im)` pair
pub fn format_complex(value: Complex64) -> String {
    format!("({},{})", value.re, value.im)
}

pub fn write_components<W: Write>(out: &mut W, elements: &[Element]) -> Result<()> {
    for element in elements {
        writeln!(out, "{} = {} {}", element.name(), element.value, element.kind.unit())?;
    }
    Ok(())
}

pub fn write_phasors<W: Write>(out: &mut W, phasors: &[NodePhasor]) -> Result<()> {
    for phasor in phasors {
        writeln!(out, "V{}(s) = {} V", phasor.node, format_complex(phasor.value()))?;
    }
    Ok(())
}

pub fn write_report<W: Write>(out: &mut W, report: &TimeDomainReport) -> Result<()> {
    writeln!(out, "\nTime-Domain Analysis at t = {} seconds:", report.time)?;
    for (node, voltage) in report.voltages.iter().enumerate() {
        writeln!(out, "V{}(t) = {:.4} V", node, voltage)?;
    }
    for branch in &report.currents {
        writeln!(
            out,
            "Current through resistor {} at t = {}s: {:.4} A",
            branch.name(),
            report.time,
            branch.current
        )?;
    }
    Ok(())
}

/// One row per instant: `time, V(0).., I(Rab)..`
pub fn export_csv(reports: &[TimeDomainReport], filename: &str) -> Result<()> {
    let file = File::create(filename)
        .with_context(|| format!("Failed to create '{}'", filename))?;
    let mut writer = Writer::from_writer(file);

    if let Some(first) = reports.first() {
        let mut header = vec!["time".to_string()];
        for node in 0..first.voltages.len() {
            header.push(format!("V({})", node));
        }
        for branch in &first.currents {
            header.push(format!("I({})", branch.name()));
        }
        writer.write_record(&header)?;
    }

    for report in reports {
        let mut record = vec![report.time.to_string()];
        record.extend(report.voltages.iter().map(|v| v.to_string()));
        record.extend(report.currents.iter().map(|c| c.current.to_string()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    info!("Results exported to CSV: {}", filename);
    Ok(())
}

pub fn export_json(reports: &[TimeDomainReport], filename: &str) -> Result<()> {
    let file = File::create(filename)
        .with_context(|| format!("Failed to create '{}'", filename))?;
    serde_json::to_writer_pretty(file, reports)?;

    info!("Results exported to JSON: {}", filename);
    Ok(())
}
