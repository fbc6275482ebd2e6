use clap::Parser;
use coolsim::core::energy_supply::tariff::TariffData;
use coolsim::input::{ClimateMode, PolicyKind};
use coolsim::output::FileOutput;
use coolsim::read_climate_file::ensemble_from_csv;
use coolsim::{run_project, ExternalData, ProjectOptions, RequestOverrides};
use std::ffi::OsStr;
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Default, Debug)]
#[clap(author, version, about, long_about = None)]
struct CoolsimArgs {
    input_file: String,
    #[arg(
        long,
        short,
        help = "Path to historical climate ensemble in .csv format, one column of hourly temperatures per year"
    )]
    climate_file: Option<String>,
    #[arg(long, short, help = "Path to tariff data file in .csv format")]
    tariff_file: Option<String>,
    #[arg(long, short = 'n', help = "Number of Monte Carlo runs")]
    runs: Option<i64>,
    #[arg(long, short, help = "Base seed of the batch")]
    seed: Option<u64>,
    #[arg(long, help = "Number of worker threads (defaults to one per core)")]
    threads: Option<usize>,
    #[arg(
        long,
        help = "Stop starting new runs after this many seconds and report the runs completed so far"
    )]
    timeout_secs: Option<u64>,
    #[arg(long, short, help = "Control policy: baseline or optimized")]
    policy: Option<PolicyKind>,
    #[arg(long, help = "Climate mode: statistical or historical")]
    climate_mode: Option<ClimateMode>,
    #[arg(long, short, help = "Identifier of the equipment profile in the catalog")]
    equipment: Option<String>,
    #[clap(
        long,
        default_value_t = false,
        help = "Run both control policies on the same seeds and compare them"
    )]
    compare: bool,
    #[clap(long, default_value_t = false, help = "Whether to log out spans")]
    log_spans: bool,
}

fn main() -> anyhow::Result<()> {
    let args = CoolsimArgs::parse();

    // set up basic tracing
    let tracing_subscriber = {
        let mut builder = tracing_subscriber::fmt::fmt().with_max_level(tracing::Level::INFO);

        if args.log_spans {
            builder = builder
                .with_max_level(tracing::Level::DEBUG)
                .with_span_events(FmtSpan::CLOSE);
        }

        builder.finish()
    };
    tracing::subscriber::set_global_default(tracing_subscriber)
        .expect("setting tracing subscriber failed");

    let input_file = args.input_file.as_str();
    let input_file_ext = Path::new(input_file).extension().and_then(OsStr::to_str);
    let input_file_stem = match input_file_ext {
        Some(ext) => &input_file[..(input_file.len() - ext.len() - 1)],
        None => input_file,
    };
    let input_file_stem = PathBuf::from(input_file_stem);

    let output_path = PathBuf::from(format!("{}__results", input_file_stem.display()));
    fs::create_dir_all(&output_path)?;
    let input_file_name = input_file_stem
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("coolsim");
    let file_output = FileOutput::new(output_path, format!("{input_file_name}__{{}}.{{}}"));

    let external_data = ExternalData {
        climate_ensemble: args
            .climate_file
            .as_ref()
            .map(|file| ensemble_from_csv(BufReader::new(File::open(file)?)))
            .transpose()?,
        tariff: args
            .tariff_file
            .as_ref()
            .map(|file| TariffData::new(BufReader::new(File::open(file)?)))
            .transpose()?,
    };

    let options = ProjectOptions {
        overrides: RequestOverrides {
            n_runs: args.runs,
            seed: args.seed,
            control_policy: args.policy,
            climate_mode: args.climate_mode,
            equipment_id: args.equipment.clone(),
        },
        threads: args.threads,
        timeout: args.timeout_secs.map(Duration::from_secs),
        compare: args.compare,
        ..Default::default()
    };

    let results = run_project(
        BufReader::new(File::open(Path::new(input_file))?),
        &file_output,
        external_data,
        &options,
    )?;

    for (policy, payload) in &results.payloads {
        let stats = &payload.aggregate_statistics;
        info!(
            "{policy}: {} runs, mean cost {:.2}, costo90 {:.2} (min {:.2}, max {:.2})",
            stats.n, stats.mean, stats.p90, stats.min, stats.max
        );
        if !payload.failed_runs.is_empty() || payload.skipped_runs > 0 {
            info!(
                "{policy}: {} runs failed, {} not started",
                payload.failed_runs.len(),
                payload.skipped_runs
            );
        }
    }
    if let Some(comparison) = &results.comparison {
        info!(
            "optimized vs baseline: mean {:.1}% lower, costo90 {:.1}% lower",
            comparison.mean_improvement_pct, comparison.p90_improvement_pct
        );
    }
    debug!("JSON response: {}", serde_json::to_string_pretty(&results)?);

    Ok(())
}
