use expertmatch_protocol::{NamedResultSet, SourceWeights};
use expertmatch_search::ResultFusionService;
use proptest::prelude::*;
use std::collections::HashSet;

fn named(lists: &[Vec<u8>]) -> NamedResultSet {
    lists
        .iter()
        .enumerate()
        .map(|(i, ids)| {
            let mut seen = HashSet::new();
            let ids: Vec<String> = ids
                .iter()
                .filter(|id| seen.insert(**id))
                .map(|id| id.to_string())
                .collect();
            (format!("source{i}"), ids)
        })
        .collect()
}

proptest! {
    #[test]
    fn fusion_is_deterministic(
        lists in prop::collection::vec(prop::collection::vec(0u8..20, 0..8), 1..4),
        weight in 0.0f64..2.0,
    ) {
        let results = named(&lists);
        let weights = SourceWeights::new().with("source0", weight);
        let fusion = ResultFusionService::default();

        let first = fusion.fuse_with_weights(Some(&results), Some(&weights)).expect("fuse");
        let second = fusion.fuse_with_weights(Some(&results), Some(&weights)).expect("fuse");
        prop_assert_eq!(&first, &second);

        let unique: HashSet<&String> = first.iter().collect();
        prop_assert_eq!(unique.len(), first.len());
        let expected: HashSet<String> = results
            .iter()
            .flat_map(|(_, ids)| ids.iter().cloned())
            .collect();
        prop_assert_eq!(first.iter().cloned().collect::<HashSet<_>>(), expected);
    }

    #[test]
    fn candidate_first_everywhere_ranks_first(
        tails in prop::collection::vec(prop::collection::vec(1u8..20, 0..6), 1..4),
    ) {
        let lists: Vec<Vec<u8>> = tails
            .into_iter()
            .map(|tail| std::iter::once(0u8).chain(tail).collect())
            .collect();
        let fused = ResultFusionService::default()
            .fuse(Some(&named(&lists)))
            .expect("fuse");
        prop_assert_eq!(fused.first().map(String::as_str), Some("0"));
    }
}

#[test]
fn shared_candidate_ranks_at_least_as_high_as_single_source_ones() {
    let results = named(&[vec![1, 2, 3], vec![2, 4, 5]]);
    let fused = ResultFusionService::default()
        .fuse(Some(&results))
        .expect("fuse");
    assert_eq!(fused[0], "2");
}
