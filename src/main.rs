use anyhow::Context as _;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use logfold::colors::ColorChoice;
use logfold::output_format::OutputFormat;
use logfold::plugins::{AnsiEscape, ForceApplication, JoinAllLines, Json};
use logfold::{Context, Processor, ProcessorConfig, WriterDebugLog, WriterSink};

#[derive(Parser, Debug)]
#[command(name = "logfold")]
#[command(about = "Group and classify raw log lines into structured records")]
#[command(version)]
struct Args {
    /// Input file (default: stdin)
    #[arg(value_name = "FILE")]
    input_file: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Skip lines before this one
    #[arg(long, value_name = "N")]
    start_line: Option<usize>,

    /// Stop after this many lines past the start line (0 for no limit)
    #[arg(long, value_name = "N")]
    line_amount: Option<usize>,

    /// Keep raw and rendered source text on each record
    #[arg(long)]
    include_source: bool,

    /// Force a flush when this many lines are pending
    #[arg(long, value_name = "N")]
    max_backlog_lines: Option<usize>,

    /// Longest accepted input line in bytes
    #[arg(long, value_name = "BYTES")]
    buffer_size: Option<usize>,

    /// Output format
    #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Jsonl)]
    output_format: OutputFormat,

    /// Colorize logfmt and text output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Tag lines with this application and split groups when it changes
    #[arg(long, value_name = "NAME")]
    application: Option<String>,

    /// Keep ANSI escape sequences in lines
    #[arg(long)]
    no_ansi_clean: bool,

    /// Do not detect JSON objects
    #[arg(long)]
    no_json: bool,

    /// Join consecutive unrecognized lines into one record
    #[arg(long)]
    join_lines: bool,

    /// Trace every source line and record on stderr
    #[arg(long)]
    debug: bool,

    /// Log level for diagnostics (RUST_LOG takes precedence)
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    log_level: String,

    /// Print processing statistics on stderr
    #[arg(long)]
    stats: bool,
}

impl Args {
    /// File configuration, overridden by any flag given
    fn build_config(&self) -> anyhow::Result<ProcessorConfig> {
        let mut config = match &self.config {
            Some(path) => ProcessorConfig::from_yaml_file(path)?,
            None => ProcessorConfig::default(),
        };

        if let Some(start_line) = self.start_line {
            config.job.start_line = start_line;
        }
        if let Some(line_amount) = self.line_amount {
            config.job.line_amount = Some(line_amount);
        }
        if self.include_source {
            config.job.include_source = true;
        }
        if let Some(max) = self.max_backlog_lines {
            config.job.max_backlog_lines = max;
        }
        if let Some(size) = self.buffer_size {
            config.buffer_size = size;
        }

        config.validate()?;
        Ok(config)
    }

    fn build_processor(&self, config: ProcessorConfig) -> Processor {
        let include_source = config.job.include_source;
        let mut processor = Processor::new(config);

        if !self.no_ansi_clean {
            processor.register(Arc::new(AnsiEscape));
        }
        if let Some(application) = &self.application {
            processor.register(Arc::new(ForceApplication::new(application.clone())));
        }
        if !self.no_json {
            processor.register(Arc::new(Json));
        }
        if self.join_lines {
            processor.register(Arc::new(JoinAllLines));
        }

        if self.stats {
            processor.on_job_finished(|_ctx, stats| {
                eprintln!("Final statistics:");
                eprintln!("  Lines read: {}", stats.lines_read);
                eprintln!("  Lines skipped: {}", stats.lines_skipped);
                eprintln!("  Records emitted: {}", stats.records_emitted);
                eprintln!("  Records created: {}", stats.records_created);
                eprintln!("  Records dropped: {}", stats.records_dropped);
                eprintln!("  Structure matches: {}", stats.structure_matches);
                eprintln!("  Parse matches: {}", stats.parse_matches);
                eprintln!("  Consolidations: {}", stats.consolidations);
                eprintln!("  Forced flushes: {}", stats.forced_flushes);
                eprintln!("  Processing time: {:?}", stats.processing_time);
                Ok(())
            });
        }

        if self.debug {
            let debug_log = WriterDebugLog::stderr().with_include_source(include_source);
            processor = processor.with_debug_log(Arc::new(debug_log));
        }

        processor
    }
}

fn init_logging(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(&args.log_level);

    if let Err(e) = run(args) {
        eprintln!("logfold: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = args.build_config()?;
    let processor = args.build_processor(config);

    let ctx = Context::new();
    let handler_ctx = ctx.clone();
    ctrlc::set_handler(move || {
        if handler_ctx.is_cancelled() {
            // Second interrupt while blocked on input
            std::process::exit(130);
        }
        handler_ctx.cancel();
    })
    .context("Failed to install interrupt handler")?;

    let input: Box<dyn BufRead> = match &args.input_file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file '{}'", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };

    let sink = WriterSink::new(
        io::BufWriter::new(io::stdout()),
        args.output_format,
        args.color.use_colors(),
    );

    processor
        .process_reader(&ctx, input, sink)
        .context("Processing failed")?;

    Ok(())
}
