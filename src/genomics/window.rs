//! Line-oriented reader turning aligner output into [`WindowRecord`]s.
//!
//! A block starts with `QS\t<contig>:<start>-<end>` (1-based, inclusive),
//! carries any number of `QH\t<count>\t<score>\t<edit_distance>\t<trace>`
//! lines and ends with `//`. Anything else is ignored.

use std::io::{self, BufRead};

use tracing::trace;

use super::{decode_trace, AlleleRecord, WindowRecord};

const WINDOW_START: &str = "QS";
const ALLELE: &str = "QH";
const WINDOW_END: &str = "//";

/// Parse a window-start line into a 0-based half-open window.
pub fn parse_window_start(line: &str) -> Option<WindowRecord> {
    let mut fields = line.split('\t');
    if fields.next()? != WINDOW_START {
        return None;
    }
    let region = fields.next()?;
    let (chrom, span) = region.rsplit_once(':')?;
    let (start, end) = span.split_once('-')?;
    let start: u32 = start.parse().ok()?;
    let end: u32 = end.parse().ok()?;
    if chrom.is_empty() || start == 0 || end < start {
        return None;
    }
    Some(WindowRecord::new(chrom, start - 1, end))
}

/// Parse an allele line; `allele_id` is the allele's index in its window.
pub fn parse_allele(line: &str, allele_id: usize) -> Option<AlleleRecord> {
    parse_allele_span(line, allele_id).map(|(allele, _)| allele)
}

/// Allele plus the number of reference bases its trace consumes.
fn parse_allele_span(line: &str, allele_id: usize) -> Option<(AlleleRecord, u32)> {
    let mut fields = line.split('\t');
    if fields.next()? != ALLELE {
        return None;
    }
    let count: u32 = fields.next()?.parse().ok()?;
    let score: i32 = fields.next()?.parse().ok()?;
    let edit_distance: u32 = fields.next()?.parse().ok()?;
    let decoded = match fields.next() {
        Some(cs) => match decode_trace(cs, allele_id) {
            Ok(decoded) => decoded,
            Err(err) => {
                trace!(%err, "skipping allele with malformed trace");
                return None;
            }
        },
        None => Default::default(),
    };
    let allele = AlleleRecord::new(
        count,
        score,
        edit_distance,
        decoded.fragments,
        decoded.n_edits,
    );
    Some((allele, decoded.ref_len))
}

/// Streaming iterator over the complete window blocks of a reader.
#[derive(Debug)]
pub struct WindowReader<R> {
    reader: R,
    line: String,
    open: Option<WindowRecord>,
}

impl<R: BufRead> WindowReader<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: String::new(),
            open: None,
        }
    }

    fn next_window(&mut self) -> io::Result<Option<WindowRecord>> {
        loop {
            self.line.clear();
            if self.reader.read_line(&mut self.line)? == 0 {
                // an unterminated block is incomplete
                self.open = None;
                return Ok(None);
            }
            let line = self.line.trim_end_matches(['\n', '\r']);

            if line == WINDOW_END {
                if let Some(window) = self.open.take() {
                    return Ok(Some(window));
                }
            } else if line.starts_with(WINDOW_START) {
                if let Some(window) = parse_window_start(line) {
                    self.open = Some(window);
                }
            } else if let Some(window) = self.open.as_mut() {
                if let Some((allele, ref_len)) = parse_allele_span(line, window.alleles.len()) {
                    if ref_len > window.len() {
                        trace!(
                            ref_len,
                            window_len = window.len(),
                            "skipping allele longer than its window"
                        );
                    } else {
                        window.alleles.push(allele);
                    }
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for WindowReader<R> {
    type Item = io::Result<WindowRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_window().transpose()
    }
}

/// Read every complete window from an in-memory buffer.
pub fn read_windows(text: &str) -> io::Result<Vec<WindowRecord>> {
    WindowReader::new(text.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_start_is_converted_to_half_open() {
        let window = parse_window_start("QS\tchr1:101-120\t20").unwrap();
        assert_eq!(window.chrom.as_ref(), "chr1");
        assert_eq!((window.start, window.end), (100, 120));
    }

    #[test]
    fn contig_may_contain_colons() {
        let window = parse_window_start("QS\tHLA-A*01:01:1-31").unwrap();
        assert_eq!(window.chrom.as_ref(), "HLA-A*01:01");
        assert_eq!((window.start, window.end), (0, 31));
    }

    #[test]
    fn malformed_lines_are_ignored() {
        assert!(parse_window_start("QS\tchr1").is_none());
        assert!(parse_window_start("QS\tchr1:0-5").is_none());
        assert!(parse_allele("QH\tfour\t30\t0\t:20", 0).is_none());
        assert!(parse_allele("QH\t4\t30\t0\t:20?", 0).is_none());
        assert!(parse_allele("QX\t4\t30\t0\t:20", 0).is_none());
    }

    #[test]
    fn reader_groups_alleles_per_block() {
        let text = "\
QS\tchr1:101-120
QH\t4\t30\t0\t:20
QH\t2\t20\t1\t:5*AG:14
garbage line
//
QH\t9\t9\t0\t:20
QS\tchr1:111-130
QH\t6\t30\t0\t:20
//
QS\tchr1:121-140
QH\t6\t30\t0\t:20
";
        let windows = read_windows(text).unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].alleles.len(), 2);
        assert_eq!(windows[0].alleles[1].edits[0].allele_id, 1);
        assert_eq!(windows[1].start, 110);
        assert_eq!(windows[1].alleles.len(), 1);
    }

    #[test]
    fn allele_overrunning_its_window_is_skipped() {
        let text = "\
QS\tchr1:4294967200-4294967295
QH\t1\t30\t1\t:200*AG
QH\t2\t30\t0\t:96
//
QS\tchr1:101-120
QH\t1\t30\t1\t:20*AG
QH\t1\t30\t1\t:5*AG:10
//
";
        let windows = read_windows(text).unwrap();
        assert_eq!(windows[0].alleles.len(), 1);
        assert_eq!(windows[0].alleles[0].count, 2);
        assert_eq!(windows[1].alleles.len(), 1);
        assert_eq!(windows[1].alleles[0].edits[0].start, 5);
        assert_eq!(windows[1].alleles[0].edits[0].allele_id, 0);
    }

    #[test]
    fn allele_without_trace_has_no_edits() {
        let allele = parse_allele("QH\t3\t25\t2", 0).unwrap();
        assert_eq!(allele.count, 3);
        assert!(allele.edits.is_empty());
        assert_eq!(allele.n_edits, 0);
    }
}
