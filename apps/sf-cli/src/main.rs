use clap::{Parser, Subcommand, ValueEnum};
use sf_project::{Project, ProjectError};
use sf_sim::{CaseStatus, Electrode, SimError, SimProgress, Simulation, SimulationReport};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(about = "StackFlow CLI - steady-state fuel-cell stack simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate project file syntax and parameters
    Validate {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
    },
    /// Run the polarization sweep of a project
    Run {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
        /// Target current densities in A/m², replacing the project's sweep
        #[arg(short, long = "target")]
        targets: Vec<f64>,
        /// Write the full result bundle as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Print the parsed project with all defaults filled in
    ShowConfig {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

type CliResult<T> = Result<T, CliError>;

fn main() -> CliResult<()> {
    // RUST_LOG selects the level, e.g. RUST_LOG=sf_sim=debug
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Run {
            project_path,
            targets,
            json,
        } => cmd_run(&project_path, targets, json.as_deref()),
        Commands::ShowConfig {
            project_path,
            format,
        } => cmd_show_config(&project_path, format),
    }
}

fn cmd_validate(project_path: &Path) -> CliResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = sf_project::load(project_path)?;
    println!("✓ Project is valid");
    println!(
        "  {} cells × {} elements, {} operating points",
        project.stack.stack.cell_count,
        project.stack.stack.elements,
        project.simulation.target_current_densities_a_per_m2.len()
    );
    Ok(())
}

fn cmd_run(project_path: &Path, targets: Vec<f64>, json: Option<&Path>) -> CliResult<()> {
    let Project {
        name,
        simulation,
        stack,
        ..
    } = sf_project::load(project_path)?;
    println!("Running project: {}", name);
    tracing::info!(
        project = %name,
        cells = stack.stack.cell_count,
        elements = stack.stack.elements,
        "project loaded"
    );

    let sim = Simulation::new(stack, simulation)?;
    let start = Instant::now();
    let mut last_emit = Instant::now();
    let mut on_progress = |event: SimProgress| {
        let finished = matches!(event, SimProgress::CaseFinished { .. });
        if finished || last_emit.elapsed().as_millis() >= 100 {
            render_progress(&event);
            last_emit = Instant::now();
        }
    };
    // Targets given on the command line replace the project's sweep.
    let report = if targets.is_empty() {
        sim.run_with_progress(Some(&mut on_progress))?
    } else {
        sim.run_targets_with_progress(&targets, Some(&mut on_progress))?
    };
    clear_progress_line();
    tracing::info!(
        cases = report.cases.len(),
        abandoned = report.abandoned.len(),
        all_converged = report.all_converged(),
        elapsed_s = start.elapsed().as_secs_f64(),
        "run finished"
    );

    print_report(&report);
    println!("\nTotal: {:.2}s", start.elapsed().as_secs_f64());

    if let Some(path) = json {
        let content = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, content)?;
        tracing::debug!(path = %path.display(), "report written");
        println!("✓ Results written to {}", path.display());
    }
    Ok(())
}

fn cmd_show_config(project_path: &Path, format: Format) -> CliResult<()> {
    let project = sf_project::load(project_path)?;
    let content = match format {
        Format::Yaml => serde_yaml::to_string(&project)?,
        Format::Json => serde_json::to_string_pretty(&project)?,
    };
    println!("{}", content);
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_progress(event: &SimProgress) {
    match event {
        SimProgress::CaseStarted {
            case,
            cases,
            target_current_density,
        } => {
            print!(
                "\r[{}/{}] {:>8.1} A/m²  starting",
                case + 1,
                cases,
                target_current_density
            );
        }
        SimProgress::Iteration {
            case,
            iteration,
            max_iterations,
            diagnostics,
        } => {
            print!(
                "\r[case {}] iter={}/{}  current_err={:.3e}  temp_err={:.3e}",
                case + 1,
                iteration,
                max_iterations,
                diagnostics.current_error,
                diagnostics.temperature_error
            );
        }
        SimProgress::CaseFinished {
            case,
            status,
            iterations,
            average_cell_voltage,
        } => {
            clear_progress_line();
            println!(
                "[case {}] {} after {} iterations, {:.4} V",
                case + 1,
                status_label(*status),
                iterations,
                average_cell_voltage
            );
        }
        SimProgress::Abandoned { targets } => {
            println!("Abandoned after collapse: {:?} A/m²", targets);
        }
    }
    let _ = io::stdout().flush();
}

fn status_label(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Converged => "converged",
        CaseStatus::NotConverged => "NOT converged",
        CaseStatus::Collapsed => "collapsed",
    }
}

fn print_report(report: &SimulationReport) {
    println!("\nPolarization curve:");
    println!("  {:>12}  {:>10}  {:>6}", "i [A/m²]", "U_cell [V]", "conv");
    for p in report.polarization_curve() {
        println!(
            "  {:>12.1}  {:>10.4}  {:>6}",
            p.current_density,
            p.voltage,
            if p.converged { "yes" } else { "no" }
        );
    }

    println!("\nLoss breakdown (stack mean, mV):");
    println!(
        "  {:>12}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}  {:>8}",
        "i [A/m²]", "act_c", "cl_c", "gdl_c", "act_a", "cl_a", "gdl_a", "mem"
    );
    for case in &report.cases {
        let l = &case.loss_averages;
        println!(
            "  {:>12.1}  {:>8.2}  {:>8.2}  {:>8.2}  {:>8.2}  {:>8.2}  {:>8.2}  {:>8.2}",
            case.target_current_density,
            l.cathode_activation * 1e3,
            l.cathode_cl_diffusion * 1e3,
            l.cathode_gdl_diffusion * 1e3,
            l.anode_activation * 1e3,
            l.anode_cl_diffusion * 1e3,
            l.anode_gdl_diffusion * 1e3,
            l.membrane * 1e3
        );
    }
    println!("\nStack state:");
    println!(
        "  {:>12}  {:>10}  {:>12}  {:>12}  {:>10}  {:>10}",
        "i [A/m²]", "T_max [K]", "m_c [g/s]", "m_a [g/s]", "dp_c [Pa]", "dp_a [Pa]"
    );
    for case in &report.cases {
        println!(
            "  {:>12.1}  {:>10.2}  {:>12.4}  {:>12.4}  {:>10.1}  {:>10.1}",
            case.target_current_density,
            case.peak_temperature().value,
            case.header_flow(Electrode::Cathode).value * 1e3,
            case.header_flow(Electrode::Anode).value * 1e3,
            case.header_pressure_drop(Electrode::Cathode).value,
            case.header_pressure_drop(Electrode::Anode).value
        );
    }
    if !report.abandoned.is_empty() {
        println!("\nNot run: {:?}", report.abandoned);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../projects")
            .join(name)
    }

    #[test]
    fn run_with_explicit_targets_writes_the_report() {
        let out = std::env::temp_dir().join("sf_cli_single_cell_report.json");
        let _ = std::fs::remove_file(&out);
        cmd_run(&project("ht_pem_single_cell_z.yaml"), vec![1500.0], Some(&out)).unwrap();

        let text = std::fs::read_to_string(&out).unwrap();
        let report: serde_json::Value = serde_json::from_str(&text).unwrap();
        let cases = report["cases"].as_array().unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0]["target_current_density"], 1500.0);
    }

    #[test]
    fn run_rejects_negative_targets() {
        let err = cmd_run(&project("ht_pem_single_cell_z.yaml"), vec![-100.0], None).unwrap_err();
        assert!(matches!(
            err,
            CliError::Sim(SimError::InvalidTarget { index: 0, .. })
        ));
    }
}
