//! Window parsing, allele classification, variant merging and output.
//!
//! Windows flow strictly forward through the stages exposed here; the
//! [`ConflictResolver`] buffer is the only state carried from one window to
//! the next.

mod classifier;
mod mapflt;
mod merger;
mod resolver;
mod trace;
mod types;
mod variant_caller;
mod vcf;
mod window;

pub use classifier::{classify_alleles, AlleleTotals, Classification, ClassifierParams};
pub use mapflt::{write_masked_regions, MapFilter, MapFilterConfig, MaskedRegion};
pub use merger::merge_window;
pub use resolver::ConflictResolver;
pub use trace::{decode_trace, DecodedTrace, TraceError};
pub use types::{AlleleRecord, EditFragment, FragmentKey, Tier, Variant, VariantKey, WindowRecord};
pub use variant_caller::{call_vcf, StreamingVariantCaller};
pub use vcf::{
    filter_column, format_record, render_vcf, write_header, write_records, write_vcf,
    EmitOptions, ANCHOR_BASE, QUALITY,
};
pub use window::{parse_allele, parse_window_start, read_windows, WindowReader};
