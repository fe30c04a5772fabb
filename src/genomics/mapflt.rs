//! Mappability filter: merge windows whose k-mers are not uniquely placed.
//!
//! A window is mappable when the haplotypes aligning with at most
//! `max_diff` differences number between 1 and `max_hap`. All other windows
//! are flagged and nearby flagged windows are merged into regions.
//!
//! Only the count and edit-distance columns of allele lines are read here,
//! so an allele is counted even when its trace would not decode.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::Context;

use super::types::saturate_count;
use super::{parse_window_start, AlleleRecord, WindowRecord};

/// Parameters of the mappability filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapFilterConfig {
    /// Largest haplotype count still considered mappable.
    pub max_hap: u32,
    /// Alleles with a larger edit distance are not counted.
    pub max_diff: u32,
    /// Flagged windows closer than this are merged.
    pub gap_size: u32,
}

impl MapFilterConfig {
    /// Default edit and gap limits for `max_hap`.
    pub fn new(max_hap: u32) -> Self {
        Self {
            max_hap,
            max_diff: 5,
            gap_size: 50,
        }
    }
}

/// A merged run of flagged windows, 0-based half-open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskedRegion {
    /// Contig name.
    pub chrom: Arc<str>,
    /// Region start.
    pub start: u32,
    /// Region end.
    pub end: u32,
    /// Bases between merged windows not covered by any of them.
    pub gap: u32,
}

/// Streaming merger of flagged windows.
#[derive(Debug)]
pub struct MapFilter {
    config: MapFilterConfig,
    current: Option<MaskedRegion>,
}

impl MapFilter {
    /// Create a filter with no open region.
    pub fn new(config: MapFilterConfig) -> Self {
        Self {
            config,
            current: None,
        }
    }

    /// Haplotypes aligning within the edit limit.
    pub fn close_haplotypes(&self, window: &WindowRecord) -> u32 {
        let total: u64 = window
            .alleles
            .iter()
            .filter(|a| a.edit_distance <= self.config.max_diff)
            .map(|a| u64::from(a.count))
            .sum();
        saturate_count(total)
    }

    /// Whether the window's k-mers are placed uniquely enough.
    pub fn is_mappable(&self, window: &WindowRecord) -> bool {
        let n_hap = self.close_haplotypes(window);
        n_hap > 0 && n_hap <= self.config.max_hap
    }

    /// Feed one window; returns a region once it can no longer grow.
    pub fn push(&mut self, window: &WindowRecord) -> Option<MaskedRegion> {
        if self.is_mappable(window) {
            return None;
        }
        if let Some(region) = self.current.as_mut() {
            let extends = region.chrom.as_ref() == window.chrom.as_ref()
                && window.start <= region.end.saturating_add(self.config.gap_size);
            if extends {
                region.gap += window.start.saturating_sub(region.end);
                region.end = region.end.max(window.end);
                return None;
            }
        }
        self.current.replace(MaskedRegion {
            chrom: Arc::clone(&window.chrom),
            start: window.start,
            end: window.end,
            gap: 0,
        })
    }

    /// Release the last open region.
    pub fn finish(&mut self) -> Option<MaskedRegion> {
        self.current.take()
    }
}

/// Count, score and edit distance of an allele line, ignoring its trace.
fn parse_haplotype_line(line: &str) -> Option<AlleleRecord> {
    let mut fields = line.split('\t');
    if fields.next()? != "QH" {
        return None;
    }
    let count: u32 = fields.next()?.parse().ok()?;
    let score: u32 = fields.next()?.parse().ok()?;
    let edit_distance: u32 = fields.next()?.parse().ok()?;
    let score = i32::try_from(score).unwrap_or(i32::MAX);
    Some(AlleleRecord::new(count, score, edit_distance, Vec::new(), 0))
}

fn write_region<W: Write>(writer: &mut W, region: &MaskedRegion) -> std::io::Result<()> {
    writeln!(
        writer,
        "{}\t{}\t{}\t{}",
        region.chrom, region.start, region.end, region.gap
    )
}

/// Stream windows from `reader` and write flagged regions as
/// `contig\tstart\tend\tgap` lines.
pub fn write_masked_regions<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    config: MapFilterConfig,
) -> anyhow::Result<()> {
    let mut filter = MapFilter::new(config);
    let mut open: Option<WindowRecord> = None;
    for line in reader.lines() {
        let line = line.context("failed to read window block")?;
        let line = line.trim_end_matches('\r');
        if line == "//" {
            let Some(window) = open.take() else { continue };
            if let Some(region) = filter.push(&window) {
                write_region(writer, &region)?;
            }
        } else if line.starts_with("QS") {
            if let Some(window) = parse_window_start(line) {
                open = Some(window);
            }
        } else if let Some(window) = open.as_mut() {
            window.alleles.extend(parse_haplotype_line(line));
        }
    }
    if let Some(region) = filter.finish() {
        write_region(writer, &region)?;
    }
    writer.flush()?;
    Ok(())
}
