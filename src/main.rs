use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use log::{error, info};
use num_complex::Complex64;
use std::io::{self, Write};
use std::path::Path;

use laplace_sim::cli::CliArgs;
use laplace_sim::output;
use laplace_sim::parser::NetlistParser;
use laplace_sim::simulator::{Simulator, SimulatorConfig};
use laplace_sim::transform::BromwichConfig;
use laplace_sim::{Circuit, Source};

fn main() {
    let matches = create_cli().get_matches();

    let default_filter = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    if let Err(e) = run_application(&matches) {
        error!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

fn create_cli() -> Command {
    Command::new("laplaceSim")
        .version(laplace_sim::VERSION)
        .about(laplace_sim::DESCRIPTION)
        .arg(
            Arg::new("input")
                .help("Netlist file; the built-in demo circuit is used when omitted")
                .index(1),
        )
        .arg(
            Arg::new("time")
                .short('t')
                .long("time")
                .value_name("T")
                .num_args(1..)
                .help("Time instant(s) for the time-domain analysis; prompts on stdin when omitted"),
        )
        .arg(
            Arg::new("phasor-freq")
                .long("phasor-freq")
                .value_name("OMEGA")
                .help("Angular frequency at which node phasors are solved (default 10 rad/s)"),
        )
        .arg(
            Arg::new("stamping")
                .long("stamping")
                .value_name("RULE")
                .default_value("above-ground")
                .value_parser(["above-ground", "non-ground"])
                .help("Which neighbours are coupled into the admittance matrix"),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .action(ArgAction::SetTrue)
                .help("Solve the contour samples on a single thread"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output file for time-domain results"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .default_value("csv")
                .value_parser(["csv", "json"])
                .help("Output format"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase verbosity level"),
        )
}

/// 10 V DC into node 1 across 1 kOhm to ground
fn demo_circuit() -> anyhow::Result<Circuit> {
    let mut circuit = Circuit::new(Source::dc(10.0), 1, 0, 2)?;
    circuit.add_resistor(1, 0, 1000.0)?;
    Ok(circuit)
}

fn run_application(matches: &ArgMatches) -> anyhow::Result<()> {
    let args = CliArgs::from_matches(matches)?;

    info!("{}", "Starting laplaceSim".green().bold());

    let circuit = match &args.input_file {
        Some(input_file) => {
            info!("Input file: {}", input_file.bright_blue());
            if !Path::new(input_file).exists() {
                return Err(anyhow::anyhow!("Input file '{}' not found", input_file));
            }
            NetlistParser::new()
                .parse_file(input_file)?
                .into_circuit(args.stamping)?
        }
        None => demo_circuit()?.with_stamping(args.stamping),
    };

    let mut config = SimulatorConfig {
        bromwich: BromwichConfig {
            parallel: args.parallel,
            ..BromwichConfig::default()
        },
        ..SimulatorConfig::default()
    };
    if let Some(omega) = args.phasor_omega {
        config.phasor_s = Complex64::new(0.0, omega);
    }

    let simulator = Simulator::with_config(circuit, config);
    simulator.circuit().print_summary();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.times.is_empty() {
        let stdin = io::stdin();
        simulator.analyze(&mut stdin.lock(), &mut out)?;
    } else {
        writeln!(out, "Input: {}", simulator.source_expression())?;
        output::write_components(&mut out, &simulator.list_components())?;
        writeln!(
            out,
            "Source (Laplace Transform): {}",
            output::format_complex(simulator.source_probe())
        )?;
        output::write_phasors(&mut out, &simulator.default_phasors()?)?;

        let reports = simulator.analyze_at_times(&args.times)?;
        for report in &reports {
            output::write_report(&mut out, report)?;
        }

        if let Some(output_file) = &args.output_file {
            simulator.export_results(&reports, output_file, args.output_format)?;
            info!("Results exported to: {}", output_file.bright_green());
        }
    }

    info!("{}", "Analysis completed successfully!".green().bold());
    Ok(())
}
