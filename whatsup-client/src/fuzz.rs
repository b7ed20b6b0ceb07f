#![cfg(test)]

use std::collections::HashMap;

use crate::{
    api::{Comment, CommentId},
    build_forest,
    test_util::comment,
    Forest,
};

// Ids are positions in the input, parents may point anywhere including past
// the end (orphans), at themselves or into loops
fn arbitrary_relation(parents: &[Option<u8>]) -> Vec<Comment> {
    let bound = parents.len() as i64 + 3;
    parents
        .iter()
        .enumerate()
        .map(|(i, p)| comment(i as i64, p.map(|p| p as i64 % bound)))
        .collect()
}

// Parents always come earlier in the input, or are missing from it
fn acyclic_relation(parents: &[Option<u8>]) -> Vec<Comment> {
    parents
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let parent = p.map(|p| match (p as usize) < i {
                true => p as i64,
                false => 1000 + p as i64,
            });
            comment(i as i64, parent)
        })
        .collect()
}

fn tree_parents(forest: &Forest) -> HashMap<CommentId, Option<CommentId>> {
    let mut res = HashMap::new();
    for r in forest.roots() {
        res.insert(r.id(), None);
    }
    for (_, n) in forest.walk() {
        for c in n.children.iter() {
            res.insert(c.id(), Some(n.id()));
        }
    }
    res
}

#[test]
fn every_record_appears_exactly_once() {
    bolero::check!()
        .with_type::<Vec<Option<u8>>>()
        .cloned()
        .for_each(|parents| {
            let records = arbitrary_relation(&parents);
            let forest = build_forest(&records);
            let mut seen = forest.walk().map(|(_, n)| n.id().0).collect::<Vec<_>>();
            seen.sort_unstable();
            assert_eq!(seen, (0..records.len() as i64).collect::<Vec<_>>());
            assert_eq!(forest.len(), records.len());
        });
}

#[test]
fn nesting_follows_declared_parents() {
    bolero::check!()
        .with_type::<Vec<Option<u8>>>()
        .cloned()
        .for_each(|parents| {
            let records = arbitrary_relation(&parents);
            let forest = build_forest(&records);
            for (depth, n) in forest.walk() {
                for c in n.children.iter() {
                    assert_eq!(c.comment.parent_id, Some(n.id()));
                }
                if depth == 0 {
                    continue;
                }
                assert!(n.comment.parent_id.is_some());
            }
        });
}

#[test]
fn acyclic_relation_is_reproduced_exactly() {
    bolero::check!()
        .with_type::<Vec<Option<u8>>>()
        .cloned()
        .for_each(|parents| {
            let records = acyclic_relation(&parents);
            let forest = build_forest(&records);
            let got = tree_parents(&forest);
            for r in records.iter() {
                let expected = r.parent_id.filter(|p| p.0 < 1000);
                assert_eq!(got.get(&r.id), Some(&expected), "misplaced {:?}", r.id);
            }
            let roots = forest.roots().iter().map(|n| n.id()).collect::<Vec<_>>();
            let expected_roots = records
                .iter()
                .filter(|r| r.parent_id.map_or(true, |p| p.0 >= 1000))
                .map(|r| r.id)
                .collect::<Vec<_>>();
            assert_eq!(roots, expected_roots);
        });
}

#[test]
fn rebuilding_gives_the_same_forest() {
    bolero::check!()
        .with_type::<Vec<Option<u8>>>()
        .cloned()
        .for_each(|parents| {
            let records = arbitrary_relation(&parents);
            assert_eq!(build_forest(&records), build_forest(&records));
        });
}
