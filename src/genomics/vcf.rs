use anyhow::{anyhow, Result};
use std::io::Write;

use super::Variant;

/// Fixed QUAL column value.
pub const QUALITY: u32 = 60;
/// Anchor base prepended to both alleles of an indel.
pub const ANCHOR_BASE: char = 'N';

const HEADER: &str = concat!(
    "##fileformat=VCFv4.3\n",
    "##source=kcall\n",
    "##INFO=<ID=AC,Number=1,Type=Integer,Description=\"Number of real haplotypes carrying the allele\">\n",
    "##INFO=<ID=AN,Number=1,Type=Integer,Description=\"Number of real haplotypes in the window\">\n",
    "##INFO=<ID=AC_AMBI,Number=1,Type=Integer,Description=\"Number of ambiguous haplotypes carrying the allele\">\n",
    "##INFO=<ID=AN_AMBI,Number=1,Type=Integer,Description=\"Number of real and ambiguous haplotypes in the window\">\n",
    "##INFO=<ID=AC_DUP,Number=1,Type=Integer,Description=\"Number of likely-false haplotypes carrying the allele\">\n",
    "##INFO=<ID=AN_DUP,Number=1,Type=Integer,Description=\"Number of real, ambiguous and likely-false haplotypes in the window\">\n",
    "##INFO=<ID=RSCORE,Number=1,Type=Integer,Description=\"Best alignment score carrying the allele minus the window cutoff\">\n",
    "##INFO=<ID=SUPPORT,Number=1,Type=Integer,Description=\"Number of windows calling the allele\">\n",
    "##FILTER=<ID=AMBI,Description=\"Allele only seen at the cutoff score\">\n",
    "##FILTER=<ID=DUP,Description=\"Allele only seen below the cutoff score\">\n",
    "##FILTER=<ID=SUPPORT1,Description=\"Allele called by a single window\">\n",
    "##FILTER=<ID=CONFLICT,Description=\"A window with better geometry did not call the allele\">\n",
    "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n",
);

/// Output switches affecting the FILTER column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Do not tag single-support variants with `SUPPORT1`.
    pub keep_single_support: bool,
    /// Tag conflicted variants with `CONFLICT`.
    pub report_conflicts: bool,
}

/// Write the metadata preamble and column header.
pub fn write_header<W: Write>(writer: &mut W) -> Result<()> {
    writer.write_all(HEADER.as_bytes())?;
    Ok(())
}

/// Semicolon-joined FILTER tags, or `PASS`.
pub fn filter_column(variant: &Variant, options: &EmitOptions) -> String {
    let mut tags = Vec::with_capacity(3);
    if let Some(tag) = variant.tier.filter_tag() {
        tags.push(tag);
    }
    if variant.support < 2 && !options.keep_single_support {
        tags.push("SUPPORT1");
    }
    if variant.conflict && options.report_conflicts {
        tags.push("CONFLICT");
    }
    if tags.is_empty() {
        "PASS".to_string()
    } else {
        tags.join(";")
    }
}

/// Format one VCF data line, without the trailing newline.
pub fn format_record(variant: &Variant, options: &EmitOptions) -> String {
    let (pos, ref_allele, alt_allele) = if variant.is_substitution() {
        (
            variant.position + 1,
            variant.reference.clone(),
            variant.alternate.clone(),
        )
    } else {
        (
            variant.position,
            format!("{ANCHOR_BASE}{}", variant.reference),
            format!("{ANCHOR_BASE}{}", variant.alternate),
        )
    };

    format!(
        "{chrom}\t{pos}\t.\t{ref_allele}\t{alt_allele}\t{QUALITY}\t{filter}\t\
         AC={ac};AN={an};AC_AMBI={ac_ambi};AN_AMBI={an_ambi};AC_DUP={ac_flt};AN_DUP={an_flt};\
         RSCORE={rscore};SUPPORT={support}",
        chrom = variant.chrom,
        filter = filter_column(variant, options),
        ac = variant.ac_real,
        an = variant.an_real,
        ac_ambi = variant.ac_ambi,
        an_ambi = variant.an_ambi,
        ac_flt = variant.ac_flt,
        an_flt = variant.an_flt,
        rscore = variant.rel_score,
        support = variant.support,
    )
}

/// Write data lines for `variants`.
pub fn write_records<W: Write>(
    writer: &mut W,
    variants: &[Variant],
    options: &EmitOptions,
) -> Result<()> {
    for variant in variants {
        writeln!(writer, "{}", format_record(variant, options))?;
    }
    Ok(())
}

/// Write a complete VCF: header then records.
pub fn write_vcf<W: Write>(writer: &mut W, variants: &[Variant], options: &EmitOptions) -> Result<()> {
    write_header(writer)?;
    write_records(writer, variants, options)?;
    writer.flush()?;
    Ok(())
}

/// Render variants into a VCF string (useful for tests and snapshots).
pub fn render_vcf(variants: &[Variant], options: &EmitOptions) -> Result<String> {
    let mut buffer = Vec::new();
    write_vcf(&mut buffer, variants, options)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered VCF is not valid UTF-8"))
}
