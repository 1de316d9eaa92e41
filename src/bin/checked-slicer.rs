//! CLI entry point.
//!
//! `slice` drives the crate's actual capability end to end: load a
//! pre-computed procedure registry and execution trace from a bundle file
//! and print the dynamic backward slice of one instruction in it. `run`
//! exposes the wider, project-level surface this crate sits behind
//! (project discovery, report generation, test-runner integration) without
//! implementing it — those are external collaborators per the design, so
//! `run` only validates its configuration and says so.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use checked_slicer::{load_bundle, Preset, SlicerError, SlicingConfig, SlicingCriterion, SlicingEngine};

#[derive(Parser)]
#[command(name = "checked-slicer")]
#[command(about = "Dynamic backward slicing for checked-coverage analysis", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compute and print the dynamic backward slice of one traced instruction.
    Slice(SliceArgs),
    /// Validate a project-level configuration. Test discovery, instrumentation
    /// and report generation are out of scope for this crate; this only
    /// exercises the config/error path a full harness would sit behind.
    Run(RunArgs),
}

#[derive(clap::Args)]
struct SliceArgs {
    /// Path to a JSON bundle holding the code-object registry and trace.
    #[arg(long)]
    bundle: PathBuf,

    /// Code object the criterion instruction belongs to.
    #[arg(long)]
    code_object: u32,

    /// Byte offset of the criterion instruction within that code object.
    #[arg(long)]
    offset: u32,

    /// Position of the criterion's occurrence in the trace's event list.
    #[arg(long)]
    trace_position: usize,

    #[arg(long, value_enum, default_value_t = CliPreset::Fast)]
    preset: CliPreset,

    #[arg(long)]
    max_test_time_ms: Option<u64>,

    #[arg(long)]
    max_slicing_time_ms: Option<u64>,

    /// 0 = silent, 1 = per-assertion summary, 2 = per-step state dump.
    #[arg(long)]
    debug_output: Option<u8>,

    /// Additional names treated as assertion calls.
    #[arg(long = "custom-assertion")]
    custom_assertions: Vec<String>,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Root of the project under analysis.
    #[arg(long)]
    project: PathBuf,

    /// Directory reports are written to.
    #[arg(long, default_value = "checked-coverage-report")]
    report_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = CoverageType::Checked)]
    coverage_type: CoverageType,

    #[arg(long, value_enum, default_value_t = ReportFormat::Json)]
    report_format: ReportFormat,

    /// Glob pattern used to discover tests.
    #[arg(long, default_value = "test_*.py")]
    test_pattern: String,

    #[arg(long, value_enum, default_value_t = CliPreset::Fast)]
    preset: CliPreset,

    #[arg(long)]
    max_test_time_ms: Option<u64>,

    #[arg(long)]
    max_slicing_time_ms: Option<u64>,

    #[arg(long = "custom-assertion")]
    custom_assertions: Vec<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliPreset {
    Fast,
    Thorough,
}

impl From<CliPreset> for Preset {
    fn from(value: CliPreset) -> Self {
        match value {
            CliPreset::Fast => Preset::Fast,
            CliPreset::Thorough => Preset::Thorough,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum CoverageType {
    Checked,
    Executed,
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Json,
    Markdown,
}

fn config_from(preset: CliPreset, max_test_time_ms: Option<u64>, max_slicing_time_ms: Option<u64>, debug_output: Option<u8>, custom_assertions: Vec<String>) -> SlicingConfig {
    let mut config = SlicingConfig::from_preset(preset.into());
    if let Some(ms) = max_test_time_ms {
        config.max_test_time_ms = ms;
    }
    if let Some(ms) = max_slicing_time_ms {
        config.max_slicing_time_ms = ms;
    }
    if let Some(level) = debug_output {
        config.debug_output = level;
    }
    config.custom_assertions = custom_assertions;
    config
}

fn run_slice(args: SliceArgs) -> Result<(), SlicerError> {
    let config = config_from(args.preset, args.max_test_time_ms, args.max_slicing_time_ms, args.debug_output, args.custom_assertions);
    config.validate()?;

    let (registry, trace) = load_bundle(&args.bundle)?;

    let meta = registry.get(args.code_object).ok_or_else(|| SlicerError::InstructionNotFound {
        code_object_id: args.code_object,
        basic_block_id: 0,
        offset: args.offset,
    })?;
    let criterion_instr = meta
        .disassembly
        .iter()
        .find(|instr| instr.offset == args.offset)
        .cloned()
        .ok_or_else(|| SlicerError::InstructionNotFound {
            code_object_id: args.code_object,
            basic_block_id: 0,
            offset: args.offset,
        })?;

    let engine = SlicingEngine::new(registry, config);
    let criterion = SlicingCriterion::new(criterion_instr);
    let slice = engine.slice(&trace, criterion, args.trace_position)?;

    println!("slice for {} ({} instructions):", slice.origin_name, slice.len());
    for instr in &slice.instructions {
        println!("  code_object={} block={} offset={} opcode={:?}", instr.code_object_id, instr.node_id, instr.offset, instr.opcode());
    }

    Ok(())
}

fn run_project(args: RunArgs) -> Result<(), SlicerError> {
    let config = config_from(args.preset, args.max_test_time_ms, args.max_slicing_time_ms, None, args.custom_assertions);
    config.validate()?;

    if !args.project.exists() {
        return Err(SlicerError::configuration(format!("project path does not exist: {}", args.project.display())));
    }

    println!("configuration accepted for {}", args.project.display());
    println!("report directory: {}", args.report_dir.display());
    println!("test discovery, instrumentation and report generation are provided by the surrounding harness, not this crate");
    println!("run it against a bundle produced from {} and pass it to `checked-slicer slice`", args.test_pattern);
    let _ = (args.coverage_type, args.report_format);

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Slice(args) => run_slice(args),
        Command::Run(args) => run_project(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
