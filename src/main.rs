use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kcall::genomics::{call_vcf, write_masked_regions, MapFilterConfig};
use kcall::CallerConfig;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "kcall",
    version,
    about = "Tiered small-variant calls from k-mer alignment windows"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Call variants from window blocks and write VCF to stdout.
    Call {
        /// Target haplotype count.
        haplotypes: u32,
        /// Window blocks (`QS`/`QH`/`//` lines); stdin when absent or `-`.
        input: Option<PathBuf>,
        /// Score margin above the next group for a confident call.
        #[arg(short = 'a', long, default_value_t = 4)]
        ambig_margin: i32,
        /// Discard alleles this far below the cutoff.
        #[arg(short = 'd', long, default_value_t = 12)]
        drop_margin: i32,
        /// Ignore alleles with more edit operations than this.
        #[arg(short = 'e', long, default_value_t = 5)]
        max_edits: usize,
        /// Do not filter variants supported by a single window.
        #[arg(short = 's', long)]
        keep_single: bool,
        /// Add the CONFLICT filter.
        #[arg(short = 'c', long)]
        conflict: bool,
        /// Log per-window cutoff values to stderr.
        #[arg(long)]
        debug: bool,
    },
    /// Merge windows that are not uniquely mappable into regions.
    Mapflt {
        /// Largest haplotype count still considered mappable.
        max_hap: u32,
        /// Window blocks; stdin when absent or `-`.
        input: Option<PathBuf>,
        /// Maximum edit distance of a counted allele.
        #[arg(short = 'd', long, default_value_t = 5)]
        max_diff: u32,
        /// Merge flagged windows separated by up to this many bases.
        #[arg(short = 'g', long, default_value_t = 50)]
        gap: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Call {
            haplotypes,
            input,
            ambig_margin,
            drop_margin,
            max_edits,
            keep_single,
            conflict,
            debug,
        } => {
            let config = CallerConfig::new(haplotypes)
                .with_ambig_margin(ambig_margin)
                .with_drop_margin(drop_margin)
                .with_max_edits(max_edits)
                .with_keep_single_support(keep_single)
                .with_conflict_reporting(conflict)
                .with_debug(debug);
            call_vcf(open_input(input.as_ref())?, &mut writer, config)
                .context("variant calling failed")?;
        }
        Commands::Mapflt {
            max_hap,
            input,
            max_diff,
            gap,
        } => {
            let config = MapFilterConfig {
                max_hap,
                max_diff,
                gap_size: gap,
            };
            write_masked_regions(open_input(input.as_ref())?, &mut writer, config)
                .context("mappability filtering failed")?;
        }
    }

    Ok(())
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn BufRead>> {
    match path {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)
                .with_context(|| format!("failed to open input {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        _ => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}
