//! Collapse same-key edit fragments of one window into window-local variants.

use std::collections::{BTreeMap, BTreeSet};

use super::types::saturate_count;
use super::{Classification, FragmentKey, Tier, Variant, WindowRecord};

/// Build the window-local variant list.
///
/// Alleles must already be classified. Alleles with more than `max_edits`
/// edits, or with an edit reaching past the window end, contribute nothing.
/// Groups whose contributors are all discarded are dropped. Output is
/// ordered by local key.
pub fn merge_window(
    window: &WindowRecord,
    window_id: usize,
    class: &Classification,
    max_edits: usize,
) -> Vec<Variant> {
    let span = window.len();
    let mut groups: BTreeMap<FragmentKey, (u32, BTreeSet<usize>)> = BTreeMap::new();
    let usable = window
        .alleles
        .iter()
        .filter(|a| !a.is_noise(max_edits) && a.edits.iter().all(|f| f.end <= span));
    for allele in usable {
        for fragment in &allele.edits {
            let entry = groups
                .entry(fragment.key())
                .or_insert_with(|| (fragment.end, BTreeSet::new()));
            entry.1.insert(fragment.allele_id);
        }
    }

    let mut variants = Vec::with_capacity(groups.len());
    for (key, (local_end, contributors)) in groups {
        let (mut ac_real, mut ac_ambi, mut ac_flt) = (0u64, 0u64, 0u64);
        let mut best_tier = Tier::Discard;
        let mut best_score = i32::MIN;

        for &allele_id in &contributors {
            let allele = &window.alleles[allele_id];
            let tier = allele.tier.unwrap_or(Tier::Discard);
            match tier {
                Tier::ConfidentReal | Tier::MarginalReal => ac_real += u64::from(allele.count),
                Tier::Ambiguous => ac_ambi += u64::from(allele.count),
                Tier::LikelyFalse => ac_flt += u64::from(allele.count),
                Tier::Discard => {}
            }
            best_tier = best_tier.min(tier);
            best_score = best_score.max(allele.score);
        }

        if best_tier == Tier::Discard {
            continue;
        }

        let position = window.start + key.start;
        let end = window.start + local_end;
        variants.push(Variant {
            chrom: window.chrom.clone(),
            position,
            end,
            end_distance: window.end_distance(position, end),
            reference: key.reference,
            alternate: key.alternate,
            window_id,
            ac_real: saturate_count(ac_real),
            ac_ambi: saturate_count(ac_ambi),
            ac_flt: saturate_count(ac_flt),
            an_real: class.totals.an_real,
            an_ambi: class.totals.an_ambi,
            an_flt: class.totals.an_flt,
            tier: best_tier,
            rel_score: best_score - class.score_cutoff,
            support: 1,
            conflict: false,
        });
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{classify_alleles, parse_allele, ClassifierParams};

    fn window(lines: &[&str], haplotypes: u32) -> (WindowRecord, Classification) {
        let mut window = WindowRecord::new("chr1", 100, 120);
        for (id, line) in lines.iter().enumerate() {
            window.alleles.push(parse_allele(line, id).unwrap());
        }
        let params = ClassifierParams {
            haplotypes,
            ambig_margin: 4,
            drop_margin: 12,
        };
        let class = classify_alleles(&mut window.alleles, &params).unwrap();
        (window, class)
    }

    #[test]
    fn single_substitution_window() {
        let (window, class) = window(&["QH\t4\t30\t0\t:20", "QH\t2\t20\t1\t:5*AG:14"], 4);
        let variants = merge_window(&window, 7, &class, 5);
        assert_eq!(variants.len(), 1);
        let v = &variants[0];
        assert_eq!((v.position, v.end, v.end_distance), (105, 106, 5));
        assert_eq!((v.ac_real, v.ac_ambi, v.ac_flt), (0, 0, 2));
        assert_eq!((v.an_real, v.an_ambi, v.an_flt), (4, 8, 10));
        assert_eq!(v.tier, Tier::LikelyFalse);
        assert_eq!(v.rel_score, -10);
        assert_eq!((v.window_id, v.support), (7, 1));
    }

    #[test]
    fn shared_edit_aggregates_contributors() {
        // cutoff 30, next 40: score 50 is confident, score 40 ambiguous
        let (window, class) = window(
            &[
                "QH\t3\t50\t1\t:8*CT:11",
                "QH\t2\t40\t2\t:8*CT:3-GA:6",
                "QH\t3\t30\t0\t:20",
            ],
            3,
        );
        let variants = merge_window(&window, 0, &class, 5);
        assert_eq!(variants.len(), 2);
        let snv = &variants[0];
        assert_eq!(snv.reference, "C");
        assert_eq!((snv.ac_real, snv.ac_ambi), (3, 2));
        assert_eq!(snv.tier, Tier::ConfidentReal);
        assert_eq!(snv.rel_score, 20);
        let del = &variants[1];
        assert_eq!((del.position, del.end), (112, 114));
        assert_eq!(del.tier, Tier::Ambiguous);
    }

    #[test]
    fn all_discard_group_is_dropped() {
        let (window, class) = window(&["QH\t4\t60\t0\t:20", "QH\t1\t10\t3\t:2*AC:17"], 4);
        assert_eq!(window.alleles[1].tier, Some(Tier::Discard));
        assert!(merge_window(&window, 0, &class, 5).is_empty());
    }

    #[test]
    fn noisy_allele_contributes_nothing() {
        let (window, class) = window(
            &[
                "QH\t4\t30\t0\t:20",
                "QH\t2\t20\t3\t:1*AC:1*AC:1*AC:13",
                "QH\t1\t20\t1\t:1*AC:18",
            ],
            4,
        );
        let strict = merge_window(&window, 0, &class, 2);
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].ac_flt, 1);
        let lenient = merge_window(&window, 0, &class, 5);
        assert_eq!(lenient.len(), 3);
        assert_eq!(lenient[0].ac_flt, 3);
    }

    #[test]
    fn edits_past_window_end_are_ignored() {
        let (mut window, class) = window(&["QH\t4\t30\t0\t:20", "QH\t2\t20\t1\t:5*AG:14"], 4);
        let mut stray = parse_allele("QH\t1\t20\t1\t:30*CT", 2).unwrap();
        stray.tier = Some(Tier::LikelyFalse);
        window.alleles.push(stray);
        let variants = merge_window(&window, 0, &class, 5);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].position, 105);
        assert!(variants.iter().all(|v| v.end_distance >= 0));
    }

    #[test]
    fn huge_counts_saturate() {
        let (mut window, class) = window(
            &["QH\t4\t30\t0\t:20", "QH\t4294967295\t20\t1\t:5*AG:14"],
            4,
        );
        let mut twin = parse_allele("QH\t4294967295\t20\t1\t:5*AG:14", 2).unwrap();
        twin.tier = window.alleles[1].tier;
        window.alleles.push(twin);
        let variants = merge_window(&window, 0, &class, 5);
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].ac_ambi, u32::MAX);
    }

    #[test]
    fn window_without_edits_yields_nothing() {
        let (window, class) = window(&["QH\t4\t30\t0\t:20", "QH\t3\t29\t0\t:20"], 4);
        assert!(merge_window(&window, 0, &class, 5).is_empty());
    }
}
