use std::collections::HashSet;
use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::genomics::{
    classify_alleles, merge_window, write_header, write_records, ClassifierParams,
    ConflictResolver, EmitOptions, Variant, WindowReader, WindowRecord,
};
use crate::{CallerConfig, CallerError};

/// Streaming caller: one window in, zero or more finished variants out.
#[derive(Debug)]
pub struct StreamingVariantCaller {
    config: CallerConfig,
    resolver: ConflictResolver,
    next_window_id: usize,
    last_window: Option<(Arc<str>, u32)>,
    finished_contigs: HashSet<Arc<str>>,
    windows_seen: usize,
    variants_emitted: usize,
}

impl StreamingVariantCaller {
    /// Create a caller after validating `config`.
    pub fn new(config: CallerConfig) -> Result<Self, CallerError> {
        config.validate()?;
        Ok(Self {
            config,
            resolver: ConflictResolver::new(),
            next_window_id: 0,
            last_window: None,
            finished_contigs: HashSet::new(),
            windows_seen: 0,
            variants_emitted: 0,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &CallerConfig {
        &self.config
    }

    /// FILTER switches derived from the configuration.
    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            keep_single_support: self.config.keep_single_support,
            report_conflicts: self.config.report_conflicts,
        }
    }

    fn check_order(&mut self, window: &mut WindowRecord) -> Result<(), CallerError> {
        if let Some((prev_chrom, prev_start)) = &self.last_window {
            let unsorted = if prev_chrom.as_ref() == window.chrom.as_ref() {
                window.chrom = Arc::clone(prev_chrom);
                window.start < *prev_start
            } else {
                self.finished_contigs.insert(Arc::clone(prev_chrom));
                self.finished_contigs.contains(window.chrom.as_ref())
            };
            if unsorted {
                return Err(CallerError::UnsortedWindows {
                    chrom: window.chrom.to_string(),
                    start: window.start,
                    prev_chrom: prev_chrom.to_string(),
                    prev_start: *prev_start,
                });
            }
        }
        self.last_window = Some((Arc::clone(&window.chrom), window.start));
        Ok(())
    }

    /// Run one window through classification, merging and resolution.
    ///
    /// Returns the variants that became final before this window.
    pub fn process_window(&mut self, mut window: WindowRecord) -> Result<Vec<Variant>, CallerError> {
        self.check_order(&mut window)?;
        let window_id = self.next_window_id;
        self.next_window_id += 1;
        self.windows_seen += 1;

        let params = ClassifierParams {
            haplotypes: self.config.haplotypes,
            ambig_margin: self.config.ambig_margin,
            drop_margin: self.config.drop_margin,
        };
        let variants = match classify_alleles(&mut window.alleles, &params) {
            Some(class) => {
                if self.config.debug {
                    info!(
                        window_id,
                        contig = %window.chrom,
                        start = window.start,
                        end = window.end,
                        score_cutoff = class.score_cutoff,
                        score_next = class.score_next,
                        an_real = class.totals.an_real,
                        an_ambi = class.totals.an_ambi,
                        an_flt = class.totals.an_flt,
                        "window cutoff"
                    );
                }
                merge_window(&window, window_id, &class, self.config.max_edits)
            }
            None => Vec::new(),
        };

        let produced = variants.len();
        let flushed = self.resolver.process(&window, window_id, variants)?;
        debug!(
            window_id,
            contig = %window.chrom,
            start = window.start,
            alleles = window.alleles.len(),
            produced,
            flushed = flushed.len(),
            pending = self.resolver.len(),
            "window resolved"
        );
        self.variants_emitted += flushed.len();
        Ok(flushed)
    }

    /// Flush everything still pending.
    pub fn finish(&mut self) -> Vec<Variant> {
        let rest = self.resolver.finish();
        self.variants_emitted += rest.len();
        info!(
            windows = self.windows_seen,
            variants = self.variants_emitted,
            "calling finished"
        );
        rest
    }

    /// Call variants for a complete sequence of windows.
    pub fn call_variants<I>(&mut self, windows: I) -> Result<Vec<Variant>, CallerError>
    where
        I: IntoIterator<Item = WindowRecord>,
    {
        let mut variants = Vec::new();
        for window in windows {
            variants.extend(self.process_window(window)?);
        }
        variants.extend(self.finish());
        Ok(variants)
    }
}

/// Stream windows from `reader` and write VCF to `writer`.
pub fn call_vcf<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    config: CallerConfig,
) -> anyhow::Result<()> {
    let mut caller = StreamingVariantCaller::new(config)?;
    let options = caller.emit_options();
    write_header(writer)?;

    for window in WindowReader::new(reader) {
        let window = window.context("failed to read window block")?;
        let flushed = caller.process_window(window)?;
        write_records(writer, &flushed, &options)?;
    }
    write_records(writer, &caller.finish(), &options)?;
    writer.flush()?;
    Ok(())
}
