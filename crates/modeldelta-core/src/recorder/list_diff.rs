//! Minimal ordered edit script between two id sequences.

/// Edit script turning `before` into `after`
///
/// `removed` lists members of `before` outside the longest common
/// subsequence, in `before` order. `added` lists `(anchor, item)` pairs in
/// `after` order, where `anchor` is the item's immediate predecessor in
/// `after` (`None` = head). Applying all removals, then all additions in
/// order, reproduces `after` exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEdit<T> {
    pub removed: Vec<T>,
    pub added: Vec<(Option<T>, T)>,
}

impl<T> ListEdit<T> {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

pub fn edit_script<T: Clone + PartialEq>(before: &[T], after: &[T]) -> ListEdit<T> {
    let (kept_before, kept_after) = lcs_membership(before, after);

    let removed = before
        .iter()
        .zip(&kept_before)
        .filter(|(_, kept)| !**kept)
        .map(|(item, _)| item.clone())
        .collect();

    let added = after
        .iter()
        .enumerate()
        .filter(|(i, _)| !kept_after[*i])
        .map(|(i, item)| {
            let anchor = i.checked_sub(1).map(|p| after[p].clone());
            (anchor, item.clone())
        })
        .collect();

    ListEdit { removed, added }
}

/// Flags marking which positions of each sequence belong to one longest
/// common subsequence
fn lcs_membership<T: PartialEq>(a: &[T], b: &[T]) -> (Vec<bool>, Vec<bool>) {
    let (n, m) = (a.len(), b.len());
    // table[i][j] = LCS length of a[i..] and b[j..]
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if a[i] == b[j] {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut in_a = vec![false; n];
    let mut in_b = vec![false; m];
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if a[i] == b[j] {
            in_a[i] = true;
            in_b[j] = true;
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    (in_a, in_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn replay(before: &[u8], edit: &ListEdit<u8>) -> Vec<u8> {
        let mut list: Vec<u8> = before
            .iter()
            .copied()
            .filter(|x| !edit.removed.contains(x))
            .collect();
        for (anchor, item) in &edit.added {
            let at = match anchor {
                None => 0,
                Some(a) => list.iter().position(|x| x == a).map_or(list.len(), |p| p + 1),
            };
            list.insert(at, *item);
        }
        list
    }

    #[test]
    fn test_identical_lists_produce_empty_script() {
        let edit = edit_script(&["a", "b"], &["a", "b"]);
        assert!(edit.is_empty());
    }

    #[test]
    fn test_insert_in_middle_anchors_on_predecessor() {
        let edit = edit_script(&["A", "B", "C"], &["A", "B", "D", "C"]);
        assert!(edit.removed.is_empty());
        assert_eq!(edit.added, vec![(Some("B"), "D")]);
    }

    #[test]
    fn test_insert_at_head_has_no_anchor() {
        let edit = edit_script(&["A"], &["Z", "A"]);
        assert_eq!(edit.added, vec![(None, "Z")]);
    }

    #[test]
    fn test_reorder_is_remove_then_add() {
        let edit = edit_script(&["A", "B", "C"], &["C", "A", "B"]);
        assert_eq!(edit.removed, vec!["C"]);
        assert_eq!(edit.added, vec![(None, "C")]);
    }

    proptest! {
        #[test]
        fn prop_script_replays_to_target(
            before in proptest::sample::subsequence((0u8..12).collect::<Vec<_>>(), 0..12).prop_shuffle(),
            after in proptest::sample::subsequence((0u8..12).collect::<Vec<_>>(), 0..12).prop_shuffle(),
        ) {
            let edit = edit_script(&before, &after);
            prop_assert_eq!(replay(&before, &edit), after);
        }
    }
}
