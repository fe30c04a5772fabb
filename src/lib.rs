//! # Tiered small-variant calling from k-mer alignment windows
//!
//! An external aligner reports, for every genomic window, the distinct k-mer
//! alignments ("alleles") found across a haplotype collection. This crate
//! turns that evidence into one deduplicated, confidence-tiered call per
//! genomic position.
//!
//! ## Pipeline
//!
//! 1. **Decode**: edit traces become window-local [`EditFragment`]s
//! 2. **Classify**: a haplotype-count driven score cutoff assigns every allele a [`Tier`]
//! 3. **Merge**: fragments sharing a local key become window-local [`Variant`]s
//! 4. **Resolve**: overlapping windows are deduplicated in a position-ordered buffer
//! 5. **Emit**: flushed variants are written as VCF records
//!
//! ## Usage Example
//!
//! ```
//! use kcall::{CallerConfig, StreamingVariantCaller};
//! use kcall::genomics::read_windows;
//!
//! let input = "QS\tchr1:101-120\nQH\t4\t30\t0\t:20\nQH\t2\t20\t1\t:5*AG:14\n//\n";
//! let mut caller = StreamingVariantCaller::new(CallerConfig::new(4))?;
//! let variants = caller.call_variants(read_windows(input)?)?;
//! assert_eq!(variants[0].position, 105);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]

pub mod genomics; // Window parsing, classification, merging and output

pub use genomics::{
    ConflictResolver, EditFragment, StreamingVariantCaller, Tier, Variant, VariantKey,
    WindowRecord,
};

use thiserror::Error;

/// Configuration of a calling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerConfig {
    /// Target haplotype count H.
    pub haplotypes: u32,

    /// Score margin above the next group required for a confident call.
    pub ambig_margin: i32,

    /// Alleles scoring this far below the cutoff are discarded.
    pub drop_margin: i32,

    /// Alleles with more edit operations than this are ignored.
    pub max_edits: usize,

    /// Do not tag single-support variants with `SUPPORT1`.
    pub keep_single_support: bool,

    /// Tag conflicted variants with `CONFLICT`.
    pub report_conflicts: bool,

    /// Log per-window cutoff values.
    pub debug: bool,
}

impl CallerConfig {
    /// Default margins for a target of `haplotypes` haplotypes.
    pub fn new(haplotypes: u32) -> Self {
        Self {
            haplotypes,
            ambig_margin: 4,
            drop_margin: 12,
            max_edits: 5,
            keep_single_support: false,
            report_conflicts: false,
            debug: false,
        }
    }

    /// Override the ambiguity margin.
    pub fn with_ambig_margin(mut self, margin: i32) -> Self {
        self.ambig_margin = margin;
        self
    }

    /// Override the drop margin.
    pub fn with_drop_margin(mut self, margin: i32) -> Self {
        self.drop_margin = margin;
        self
    }

    /// Override the per-allele edit limit.
    pub fn with_max_edits(mut self, max_edits: usize) -> Self {
        self.max_edits = max_edits;
        self
    }

    /// Keep single-support variants unfiltered.
    pub fn with_keep_single_support(mut self, keep: bool) -> Self {
        self.keep_single_support = keep;
        self
    }

    /// Emit the `CONFLICT` filter.
    pub fn with_conflict_reporting(mut self, report: bool) -> Self {
        self.report_conflicts = report;
        self
    }

    /// Log per-window cutoff diagnostics.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Reject configurations the caller cannot work with.
    pub fn validate(&self) -> Result<(), CallerError> {
        if self.haplotypes == 0 {
            return Err(CallerError::InvalidConfiguration(
                "target haplotype count must be > 0".to_string(),
            ));
        }
        if self.ambig_margin < 0 || self.drop_margin < 0 {
            return Err(CallerError::InvalidConfiguration(format!(
                "margins must be non-negative (ambig {}, drop {})",
                self.ambig_margin, self.drop_margin
            )));
        }
        Ok(())
    }
}

/// Errors that abort a calling run.
#[derive(Error, Debug)]
pub enum CallerError {
    /// Invalid caller configuration
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// One window produced the same genomic key twice.
    #[error("window {window_id} produced variant {key} more than once")]
    DuplicateWindowVariant {
        /// Offending genomic key.
        key: VariantKey,
        /// Window that produced it.
        window_id: usize,
    },

    /// Windows did not arrive in (contig, start) order.
    #[error("window {chrom}:{start} arrived after {prev_chrom}:{prev_start}")]
    UnsortedWindows {
        /// Contig of the offending window.
        chrom: String,
        /// 0-based start of the offending window.
        start: u32,
        /// Contig of the preceding window.
        prev_chrom: String,
        /// 0-based start of the preceding window.
        prev_start: u32,
    },
}
