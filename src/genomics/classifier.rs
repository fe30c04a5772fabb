//! Haplotype-count driven score cutoff and allele tiering.

use super::types::saturate_count;
use super::{AlleleRecord, Tier};

/// Parameters of the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierParams {
    /// Target haplotype count H.
    pub haplotypes: u32,
    /// Margin above `score_next` required for a confident call.
    pub ambig_margin: i32,
    /// Alleles below `score_cutoff - drop_margin` are discarded.
    pub drop_margin: i32,
}

/// Window-wide allele totals by accepted set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlleleTotals {
    /// Real haplotypes.
    pub an_real: u32,
    /// Real plus ambiguous haplotypes.
    pub an_ambi: u32,
    /// Real, ambiguous and likely-false haplotypes.
    pub an_flt: u32,
}

/// Outcome of classifying one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Score of the first group whose cumulative count reaches H.
    pub score_cutoff: i32,
    /// Score of the first group whose cumulative count exceeds H.
    pub score_next: i32,
    /// Totals over all classified alleles.
    pub totals: AlleleTotals,
}

impl Classification {
    /// The H-th haplotype sits inside a tie group.
    pub fn is_tied(&self) -> bool {
        self.score_cutoff == self.score_next
    }
}

fn tier_for(score: i32, cutoff: i32, next: i32, params: &ClassifierParams) -> Tier {
    if score >= cutoff && score >= next.saturating_add(params.ambig_margin) {
        Tier::ConfidentReal
    } else if score >= cutoff && score > next {
        Tier::MarginalReal
    } else if score < cutoff.saturating_sub(params.drop_margin) {
        Tier::Discard
    } else if score == next {
        Tier::Ambiguous
    } else {
        Tier::LikelyFalse
    }
}

/// Assign `acc` and a tier to every allele and compute the window totals.
///
/// Alleles are grouped by equal score in ascending order and their
/// haplotype counts accumulated group by group. When no group's cumulative
/// count exceeds H, `score_next` falls back to the last group, like the
/// cutoff does. Returns `None` for a window without alleles.
pub fn classify_alleles(
    alleles: &mut [AlleleRecord],
    params: &ClassifierParams,
) -> Option<Classification> {
    if alleles.is_empty() {
        return None;
    }

    let mut order: Vec<usize> = (0..alleles.len()).collect();
    order.sort_by_key(|&i| alleles[i].score);

    let target = u64::from(params.haplotypes);
    let mut cumulative = 0u64;
    let mut cutoff = None;
    let mut next = None;
    let mut last_score = alleles[order[0]].score;

    let mut group_start = 0;
    while group_start < order.len() {
        let score = alleles[order[group_start]].score;
        let mut group_end = group_start;
        while group_end < order.len() && alleles[order[group_end]].score == score {
            cumulative += u64::from(alleles[order[group_end]].count);
            group_end += 1;
        }
        let acc = saturate_count(cumulative);
        for &i in &order[group_start..group_end] {
            alleles[i].acc = acc;
        }
        if cutoff.is_none() && cumulative >= target {
            cutoff = Some(score);
        }
        if next.is_none() && cumulative > target {
            next = Some(score);
        }
        last_score = score;
        group_start = group_end;
    }

    let score_cutoff = cutoff.unwrap_or(last_score);
    let score_next = next.unwrap_or(last_score);

    let (mut real, mut ambi, mut flt) = (0u64, 0u64, 0u64);
    for allele in alleles.iter_mut() {
        let tier = tier_for(allele.score, score_cutoff, score_next, params);
        let count = u64::from(allele.count);
        match tier {
            Tier::ConfidentReal | Tier::MarginalReal => real += count,
            Tier::Ambiguous => ambi += count,
            Tier::LikelyFalse => flt += count,
            Tier::Discard => {}
        }
        allele.tier = Some(tier);
    }

    let an_real = if score_cutoff == score_next {
        target
    } else {
        real
    };
    let an_ambi = an_real + ambi;
    let totals = AlleleTotals {
        an_real: saturate_count(an_real),
        an_ambi: saturate_count(an_ambi),
        an_flt: saturate_count(an_ambi + flt),
    };

    Some(Classification {
        score_cutoff,
        score_next,
        totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn params(haplotypes: u32) -> ClassifierParams {
        ClassifierParams {
            haplotypes,
            ambig_margin: 4,
            drop_margin: 12,
        }
    }

    fn alleles(table: &[(u32, i32)]) -> Vec<AlleleRecord> {
        table.iter()
            .map(|&(count, score)| AlleleRecord::new(count, score, 0, Vec::new(), 0))
            .collect()
    }

    #[test]
    fn tie_group_forces_real_total() {
        let mut window = alleles(&[(4, 30), (2, 20)]);
        let class = classify_alleles(&mut window, &params(4)).unwrap();
        assert_eq!((class.score_cutoff, class.score_next), (30, 30));
        assert!(class.is_tied());
        assert_eq!(window[0].tier, Some(Tier::Ambiguous));
        assert_eq!(window[1].tier, Some(Tier::LikelyFalse));
        assert_eq!((window[1].acc, window[0].acc), (2, 6));
        assert_eq!(
            class.totals,
            AlleleTotals {
                an_real: 4,
                an_ambi: 8,
                an_flt: 10
            }
        );
    }

    #[test]
    fn cutoff_and_next_split_on_exact_boundary() {
        // cumulative: 10 -> 3, 20 -> 5, 30 -> 8, 40 -> 9
        let mut window = alleles(&[(1, 40), (3, 30), (2, 20), (3, 10)]);
        let class = classify_alleles(&mut window, &params(5)).unwrap();
        assert_eq!(class.score_cutoff, 20);
        assert_eq!(class.score_next, 30);
        assert_eq!(window[0].tier, Some(Tier::ConfidentReal));
        assert_eq!(window[1].tier, Some(Tier::Ambiguous));
        assert_eq!(window[2].tier, Some(Tier::LikelyFalse));
        assert_eq!(window[3].tier, Some(Tier::LikelyFalse));
        assert_eq!(class.totals.an_real, 1);
        assert_eq!(class.totals.an_ambi, 4);
        assert_eq!(class.totals.an_flt, 9);
    }

    #[test]
    fn target_above_total_falls_back_to_last_group() {
        let mut window = alleles(&[(1, 50), (1, 10)]);
        let class = classify_alleles(&mut window, &params(10)).unwrap();
        assert_eq!((class.score_cutoff, class.score_next), (50, 50));
        assert_eq!(window[0].tier, Some(Tier::Ambiguous));
        assert_eq!(window[1].tier, Some(Tier::Discard));
        assert_eq!(class.totals.an_real, 10);
        assert_eq!(class.totals.an_flt, 11);
    }

    #[test]
    fn huge_counts_saturate_totals() {
        let mut window = alleles(&[(u32::MAX, 30), (u32::MAX, 30), (1, 50)]);
        let class = classify_alleles(&mut window, &params(4)).unwrap();
        assert_eq!((class.score_cutoff, class.score_next), (30, 30));
        assert_eq!(window[0].acc, u32::MAX);
        assert_eq!(window[2].tier, Some(Tier::ConfidentReal));
        assert_eq!(
            class.totals,
            AlleleTotals {
                an_real: 4,
                an_ambi: u32::MAX,
                an_flt: u32::MAX
            }
        );
    }

    #[test]
    fn empty_window_is_not_classified() {
        assert!(classify_alleles(&mut [], &params(4)).is_none());
    }

    // cutoff 20, next 30
    #[test_case(40, Tier::ConfidentReal ; "well above next")]
    #[test_case(33, Tier::MarginalReal ; "just above next")]
    #[test_case(30, Tier::Ambiguous ; "equal to next")]
    #[test_case(25, Tier::LikelyFalse ; "between cutoff and next")]
    #[test_case(8, Tier::LikelyFalse ; "at the drop boundary")]
    #[test_case(7, Tier::Discard ; "below the drop boundary")]
    fn tier_rules(score: i32, expected: Tier) {
        assert_eq!(tier_for(score, 20, 30, &params(5)), expected);
    }
}
