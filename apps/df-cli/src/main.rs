use clap::{Parser, Subcommand};
use df_app::{AppError, AppResult, ExperimentConfig, ExperimentReport, load_yaml, save_yaml};
use df_sim::Trajectory;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "df-cli")]
#[command(about = "dampfit CLI - damped oscillator parameter estimation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate noisy data, fit it, and print the recovered constants
    Fit {
        /// Experiment config YAML (defaults to the built-in reference experiment)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the noise / guess seed
        #[arg(long)]
        seed: Option<u64>,
        /// Override the noise standard deviation (m)
        #[arg(long)]
        noise: Option<f64>,
        /// Keep raw coefficients positive during the fit
        #[arg(long)]
        positive_bounds: bool,
        /// Write time,observed,fitted,error to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print the full report as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Simulate the nominal oscillator and export time,position,velocity
    Simulate {
        /// Experiment config YAML
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Write the default experiment config to a YAML file
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
    /// Validate an experiment config file
    Validate {
        /// Path to the config YAML file
        config: PathBuf,
    },
}

fn main() -> AppResult<()> {
    // Logs go to stderr so CSV/JSON on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fit {
            config,
            seed,
            noise,
            positive_bounds,
            csv,
            json,
        } => {
            let mut cfg = load_or_default(config.as_deref())?;
            if let Some(seed) = seed {
                cfg.noise.seed = seed;
            }
            if let Some(noise) = noise {
                cfg.noise.std_dev = noise;
            }
            if positive_bounds {
                cfg.fit.positive_bounds = true;
            }
            cmd_fit(&cfg, csv.as_deref(), json)
        }
        Commands::Simulate { config, output } => {
            let cfg = load_or_default(config.as_deref())?;
            cmd_simulate(&cfg, output.as_deref())
        }
        Commands::InitConfig { path } => cmd_init_config(&path),
        Commands::Validate { config } => cmd_validate(&config),
    }
}

fn load_or_default(path: Option<&Path>) -> AppResult<ExperimentConfig> {
    match path {
        Some(path) => load_yaml(path),
        None => Ok(ExperimentConfig::default()),
    }
}

fn cmd_fit(cfg: &ExperimentConfig, csv: Option<&Path>, json: bool) -> AppResult<()> {
    let report = df_app::run_experiment(cfg)?;

    if let Some(path) = csv {
        report.save_csv(path)?;
        eprintln!(
            "✓ Exported {} data points to {}",
            report.series.len(),
            path.display()
        );
    }

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_fit_summary(&report);
    }

    Ok(())
}

fn print_fit_summary(report: &ExperimentReport) {
    let fit = &report.fit;
    if fit.success {
        println!("✓ Fit converged ({})", fit.termination);
    } else {
        println!("✗ Fit did NOT converge ({})", fit.termination);
    }
    println!(
        "  Iterations: {}, residual evaluations: {}",
        fit.iterations, fit.evaluations
    );
    println!("  RMS residual: {:.3e} m", fit.rms);

    println!("\nRaw parameters (spring, damping, inverse_mass):");
    println!(
        "  Guess:  {:>12.6} {:>12.6} {:>12.6}",
        fit.initial_guess.spring, fit.initial_guess.damping, fit.initial_guess.inverse_mass
    );
    println!(
        "  Fitted: {:>12.6} {:>12.6} {:>12.6}",
        fit.params.spring, fit.params.damping, fit.params.inverse_mass
    );

    let p = &report.physical;
    println!("\nEstimated constants:");
    println!("  Mass:             {:.6} kg", p.mass);
    println!("  Spring constant:  {:.6} N/m", p.spring);
    println!("  Damping constant: {:.6} Ns/m", p.damping);

    let t = &report.timing;
    println!(
        "\nTiming: generate {:.3} s, fit {:.3} s, total {:.3} s",
        t.generate_s, t.fit_s, t.total_s
    );
}

fn cmd_simulate(cfg: &ExperimentConfig, output: Option<&Path>) -> AppResult<()> {
    let traj = df_app::simulate_nominal(cfg)?;
    let csv = trajectory_csv(&traj);

    if let Some(path) = output {
        std::fs::write(path, csv).map_err(|e| AppError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        println!(
            "✓ Exported {} data points to {}",
            traj.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}

fn trajectory_csv(traj: &Trajectory) -> String {
    let mut csv = String::from("time,position,velocity\n");
    for (t, s) in traj.times.iter().zip(&traj.states) {
        csv.push_str(&format!("{},{},{}\n", t, s.position, s.velocity));
    }
    csv
}

fn cmd_init_config(path: &Path) -> AppResult<()> {
    save_yaml(path, &ExperimentConfig::default())?;
    println!("✓ Wrote default config to {}", path.display());
    Ok(())
}

fn cmd_validate(path: &Path) -> AppResult<()> {
    println!("Validating config: {}", path.display());
    let cfg = load_yaml(path)?;
    println!("✓ Config is valid");
    println!(
        "  {} samples over [{}, {}] s, noise sd {}",
        cfg.time.samples, cfg.time.start, cfg.time.end, cfg.noise.std_dev
    );
    Ok(())
}
