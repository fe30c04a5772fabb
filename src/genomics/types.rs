use std::fmt;
use std::sync::Arc;

/// Confidence tiers assigned to alleles, ranked best first.
///
/// The derived ordering is load-bearing: the best tier across a set of
/// contributors is the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Score comfortably above the next group.
    ConfidentReal,
    /// Score above the cutoff but close to the next group.
    MarginalReal,
    /// Score tied with the group that crosses the haplotype target.
    Ambiguous,
    /// Below the crossing group; most likely a duplicate hit.
    LikelyFalse,
    /// Far below the cutoff; contributes nothing.
    Discard,
}

impl Tier {
    /// Whether the tier counts towards the real allele totals.
    pub fn is_real(self) -> bool {
        matches!(self, Tier::ConfidentReal | Tier::MarginalReal)
    }

    /// FILTER tag emitted for the tier, if any.
    pub fn filter_tag(self) -> Option<&'static str> {
        match self {
            Tier::ConfidentReal | Tier::MarginalReal => None,
            Tier::Ambiguous => Some("AMBI"),
            Tier::LikelyFalse => Some("DUP"),
            Tier::Discard => None,
        }
    }
}

/// A single local edit decoded from an allele's trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditFragment {
    /// Offset of the first affected reference base within the window.
    pub start: u32,
    /// Offset one past the last affected reference base.
    pub end: u32,
    /// Reference bases (empty for insertions).
    pub reference: String,
    /// Alternate bases (empty for deletions).
    pub alternate: String,
    /// Index of the owning allele inside its window.
    pub allele_id: usize,
}

impl EditFragment {
    /// Local key shared by every fragment describing the same edit.
    pub fn key(&self) -> FragmentKey {
        FragmentKey {
            start: self.start,
            reference: self.reference.clone(),
            alternate: self.alternate.clone(),
        }
    }
}

/// Window-local identity of an edit: `(start, ref, alt)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentKey {
    /// Local start offset.
    pub start: u32,
    /// Reference bases.
    pub reference: String,
    /// Alternate bases.
    pub alternate: String,
}

/// One k-mer alignment observed in a window.
#[derive(Debug, Clone, PartialEq)]
pub struct AlleleRecord {
    /// Number of haplotypes sharing this alignment.
    pub count: u32,
    /// Alignment score reported by the aligner.
    pub score: i32,
    /// Edit distance reported by the aligner.
    pub edit_distance: u32,
    /// Decoded edits, in trace order.
    pub edits: Vec<EditFragment>,
    /// Number of non-match operations in the trace.
    pub n_edits: usize,
    /// Tier assigned by the classifier.
    pub tier: Option<Tier>,
    /// Cumulative haplotype count of this allele's score group.
    pub acc: u32,
}

impl AlleleRecord {
    /// Construct an unclassified allele.
    pub fn new(
        count: u32,
        score: i32,
        edit_distance: u32,
        edits: Vec<EditFragment>,
        n_edits: usize,
    ) -> Self {
        Self {
            count,
            score,
            edit_distance,
            edits,
            n_edits,
            tier: None,
            acc: 0,
        }
    }

    /// Alleles with more edits than `max_edits` are treated as unaligned noise.
    pub fn is_noise(&self, max_edits: usize) -> bool {
        self.n_edits > max_edits
    }
}

/// Narrow a summed haplotype count, pinning at `u32::MAX`.
pub(super) fn saturate_count(count: u64) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// A parsed window block.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRecord {
    /// Reference contig/chromosome name.
    pub chrom: Arc<str>,
    /// 0-based inclusive start.
    pub start: u32,
    /// 0-based exclusive end.
    pub end: u32,
    /// Alleles in input order; fragment `allele_id`s index into this.
    pub alleles: Vec<AlleleRecord>,
}

impl WindowRecord {
    /// Construct an empty window over `[start, end)`.
    pub fn new(chrom: impl Into<Arc<str>>, start: u32, end: u32) -> Self {
        Self {
            chrom: chrom.into(),
            start,
            end,
            alleles: Vec::new(),
        }
    }

    /// Window length in bases.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` for a zero-length window.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distance of a genomic span `[pos, end)` from the nearer window boundary.
    ///
    /// Negative when the span sticks out of the window.
    pub fn end_distance(&self, pos: u32, end: u32) -> i64 {
        let left = pos as i64 - self.start as i64;
        let right = self.end as i64 - end as i64;
        left.min(right)
    }
}

/// Genomic identity of a variant, ordered by contig then position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariantKey {
    /// Contig name.
    pub chrom: Arc<str>,
    /// 0-based genomic start.
    pub position: u32,
    /// Reference bases.
    pub reference: String,
    /// Alternate bases.
    pub alternate: String,
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}>{}",
            self.chrom, self.position, self.reference, self.alternate
        )
    }
}

/// A merged variant call, possibly representing several windows.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// Contig name.
    pub chrom: Arc<str>,
    /// 0-based genomic start.
    pub position: u32,
    /// 0-based exclusive genomic end of the reference span.
    pub end: u32,
    /// Reference bases.
    pub reference: String,
    /// Alternate bases.
    pub alternate: String,
    /// Id of the window that produced the current representative.
    pub window_id: usize,
    /// Distance from the nearer boundary of that window.
    pub end_distance: i64,
    /// Real haplotypes carrying the edit.
    pub ac_real: u32,
    /// Ambiguous haplotypes carrying the edit.
    pub ac_ambi: u32,
    /// Likely-false haplotypes carrying the edit.
    pub ac_flt: u32,
    /// Real haplotypes in the window.
    pub an_real: u32,
    /// Real plus ambiguous haplotypes in the window.
    pub an_ambi: u32,
    /// All classified haplotypes in the window, discards excluded.
    pub an_flt: u32,
    /// Best tier among contributing alleles.
    pub tier: Tier,
    /// Best contributing score minus the window cutoff.
    pub rel_score: i32,
    /// Number of windows that produced this key.
    pub support: u32,
    /// A later window with better geometry failed to rediscover the key.
    pub conflict: bool,
}

impl Variant {
    /// Genomic key used for cross-window deduplication.
    pub fn key(&self) -> VariantKey {
        VariantKey {
            chrom: Arc::clone(&self.chrom),
            position: self.position,
            reference: self.reference.clone(),
            alternate: self.alternate.clone(),
        }
    }

    /// Returns `true` when reference and alternate have the same length.
    pub fn is_substitution(&self) -> bool {
        self.reference.len() == self.alternate.len()
    }
}
