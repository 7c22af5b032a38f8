use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{error, info, LevelFilter};

use mutperm::config::{Config, TestConfig, TestKind};
use mutperm::constants::*;
use mutperm::error::Error;
use mutperm::gene::Gene;
use mutperm::io::{bed, maf, output};
use mutperm::mutation::position::RecurrenceGrouping;
use mutperm::permutation::{self, GeneResult};
use mutperm::pool::WorkerPool;
use mutperm::report;
use mutperm::seq::context::ContextOrder;
use mutperm::stats::Bandwidth;

/// Exit status after an interrupt
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BandwidthMethod {
    /// Leave-one-out cross-validation
    Cv,
    /// Silverman's rule of thumb
    Silverman,
}

#[derive(Parser, Debug)]
#[command(name = "mutperm")]
#[command(version)]
#[command(about = "Permutation tests for mutation hotspots in oncogenes and deleterious mutations in tumour suppressor genes", long_about = None)]
struct Args {
    /// Genome FASTA with a .fai index
    #[arg(short, long)]
    input: PathBuf,

    /// Tab-separated mutation table
    #[arg(short, long)]
    mutations: PathBuf,

    /// BED12 gene annotation
    #[arg(short, long)]
    bed: PathBuf,

    /// Number of worker threads
    #[arg(short, long, default_value_t = 1)]
    processes: usize,

    /// Number of permutations per gene
    #[arg(short, long, default_value_t = DEFAULT_NUM_PERMUTATIONS)]
    num_permutations: usize,

    /// Kind of test: oncogene or tsg
    #[arg(short, long, default_value = "oncogene")]
    kind: TestKind,

    /// Sequence context order: 0, 1, 1.5, 2 or 3
    #[arg(short, long, default_value = "1.5")]
    context: ContextOrder,

    /// Minimum number of recurrent missense mutations to perform the oncogene test
    #[arg(short, long, default_value_t = DEFAULT_MIN_RECURRENT)]
    recurrent: usize,

    /// Minimum number of deleterious mutations to perform the tsg test
    #[arg(short, long, default_value_t = DEFAULT_MIN_DELETERIOUS)]
    deleterious: usize,

    /// Genes with a TSG score at or above this value are not tested as oncogenes
    #[arg(short, long, default_value_t = DEFAULT_TSG_SCORE)]
    tsg_score: f64,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Seed for reproducible permutations
    #[arg(short, long)]
    seed: Option<u64>,

    /// Fixed bandwidth of the kernel density estimate, in codons
    #[arg(long)]
    kde_bandwidth: Option<f64>,

    /// Bandwidth selection, unless a fixed bandwidth is given
    #[arg(long, value_enum, default_value_t = BandwidthMethod::Cv)]
    bandwidth_method: BandwidthMethod,

    /// Grouping of recurrent missense mutations: codon or codon-and-change
    #[arg(long, default_value = "codon")]
    recurrence_group: RecurrenceGrouping,

    /// Log file, or stdout (default: stderr)
    #[arg(short, long)]
    log: Option<String>,

    /// Log level: error, warn, info, debug or trace (default: RUST_LOG or info)
    #[arg(long)]
    log_level: Option<LevelFilter>,
}

impl Args {
    fn config(&self) -> Config {
        let bandwidth = match (self.kde_bandwidth, self.bandwidth_method) {
            (Some(h), _) => Bandwidth::Fixed(h),
            (None, BandwidthMethod::Cv) => Bandwidth::CrossValidated,
            (None, BandwidthMethod::Silverman) => Bandwidth::Silverman,
        };
        Config {
            input: self.input.clone(),
            mutations: self.mutations.clone(),
            bed: self.bed.clone(),
            output: self.output.clone(),
            processes: self.processes,
            tsg_score: self.tsg_score,
            test: TestConfig {
                kind: self.kind,
                num_permutations: self.num_permutations,
                context: self.context,
                min_recurrent: self.recurrent,
                min_deleterious: self.deleterious,
                bandwidth,
                grouping: self.recurrence_group,
                seed: self.seed,
            },
        }
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = args.log_level {
        builder.filter_level(level);
    }
    match args.log.as_deref() {
        Some("stdout") => {
            builder.target(env_logger::Target::Stdout);
        },
        Some(path) => {
            let f = fs::File::create(path).with_context(|| format!("could not create log file {}", path))?;
            builder.target(env_logger::Target::Pipe(Box::new(f)));
        },
        None => {},
    }
    builder.try_init().context("could not initialize logging")?;
    Ok(())
}

fn run(config: &Config, cancel: Arc<AtomicBool>) -> Result<()> {
    config.validate()?;
    info!("{} test: {} permutations, context {}, {} processes",
          config.test.kind, config.test.num_permutations, config.test.context, config.processes);

    let mut reader = maf::Reader::from_file(&config.mutations)
        .with_context(|| format!("could not open {}", config.mutations.display()))?;
    let records = maf::read_records(&mut reader)
        .with_context(|| format!("could not read mutations from {}", config.mutations.display()))?;
    let table = Arc::new(maf::MutationTable::from_records(&records));
    info!("{} of {} mutations are coding substitutions", table.len(), records.len());

    let high_tsg_score = match config.test.kind {
        TestKind::Oncogene => maf::high_tsg_score_genes(&records, config.tsg_score),
        TestKind::Tsg => HashSet::new(),
    };

    let genes = bed::Reader::from_file(&config.bed)
        .with_context(|| format!("could not open {}", config.bed.display()))?
        .genes()
        .with_context(|| format!("could not read genes from {}", config.bed.display()))?;
    let excluded: Vec<String> = genes.iter()
        .filter(|g| high_tsg_score.contains(&g.name))
        .map(|g| g.name.clone())
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();
    if !excluded.is_empty() {
        info!("{} genes exceed the TSG score of {} and are not tested", excluded.len(), config.tsg_score);
    }

    let chroms = bed::genes_by_chrom(genes, &high_tsg_score);
    info!("testing genes on {} chromosomes", chroms.len());
    let tasks: Vec<Vec<Gene>> = chroms.into_iter().map(|(_, genes)| genes).collect();

    let pool = WorkerPool::with_cancel_flag(config.processes, cancel);
    let fasta = config.input.clone();
    let test = config.test.clone();
    let shared = Arc::clone(&table);
    let mut handle = pool.submit(tasks, move |genes: Vec<Gene>, cancel: &AtomicBool| {
        permutation::test_chromosome(&fasta, &genes, &shared, &test, cancel)
    });
    let results: Vec<GeneResult> = handle.wait()?.into_iter().flatten().collect();
    info!("tested {} genes", results.len());

    let mut writer = output::Writer::to_file(&config.output)
        .with_context(|| format!("could not create {}", config.output.display()))?;
    let (position, deleterious) = report::split_results(results);
    match config.test.kind {
        TestKind::Oncogene => writer.write_oncogene(&report::oncogene_rows(position, &excluded))?,
        TestKind::Tsg => writer.write_tsg(&report::tsg_rows(deleterious))?,
    }
    info!("results written to {}", config.output.display());

    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        error!("could not install interrupt handler: {}", e);
    }

    let config = args.config();
    if let Err(e) = run(&config, cancel) {
        let interrupted = e.downcast_ref::<Error>().map_or(false, |e| e.is_cancelled());
        if interrupted {
            error!("interrupted");
            process::exit(EXIT_INTERRUPTED);
        }
        error!("{:#}", e);
        process::exit(1);
    }
}
