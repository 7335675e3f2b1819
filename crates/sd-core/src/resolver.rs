use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

/// Client-supplied ordering hints: for each equation, the equations whose
/// updates must run before it within a tick.
///
/// Names are resolved when the model is built, so hints may be declared in
/// any order relative to registration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    entries: Vec<(String, Vec<String>)>,
}

impl Dependencies {
    /// An empty hint list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `equation` must be updated after every name in `upstream`.
    pub fn declare<I, S>(mut self, equation: impl Into<String>, upstream: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .push((equation.into(), upstream.into_iter().map(Into::into).collect()));
        self
    }

    /// Hints in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(equation, upstream)| (equation.as_str(), upstream.as_slice()))
    }

    /// Number of declared hints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no hints were declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Upstream sets indexed by equation ordinal.
#[derive(Debug, Clone, Default)]
pub(crate) struct DependencyGraph {
    upstream: Vec<BTreeSet<usize>>,
}

impl DependencyGraph {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            upstream: vec![BTreeSet::new(); len],
        }
    }

    /// Record that `node` must run after `upstream`.
    pub(crate) fn add(&mut self, node: usize, upstream: usize) {
        self.upstream[node].insert(upstream);
    }

    #[cfg(test)]
    pub(crate) fn upstream(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.upstream[node].iter().copied()
    }

    /// Kahn's algorithm, always placing the lowest-ordinal ready node.
    ///
    /// On failure returns one cycle as a path of ordinals in dependency
    /// direction, closed by repeating its first node.
    pub(crate) fn topological_order(&self) -> Result<Vec<usize>, Vec<usize>> {
        let len = self.upstream.len();
        let mut downstream = vec![Vec::new(); len];
        let mut waiting: Vec<usize> = self.upstream.iter().map(BTreeSet::len).collect();
        for (node, ups) in self.upstream.iter().enumerate() {
            for &up in ups {
                downstream[up].push(node);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = waiting
            .iter()
            .enumerate()
            .filter(|(_, count)| **count == 0)
            .map(|(node, _)| Reverse(node))
            .collect();
        let mut order = Vec::with_capacity(len);
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for &next in &downstream[node] {
                waiting[next] -= 1;
                if waiting[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() == len {
            Ok(order)
        } else {
            Err(self.find_cycle(&waiting))
        }
    }

    /// Walk upstream from the first unplaced node until a node repeats.
    ///
    /// Every unplaced node still waits on at least one unplaced upstream, so
    /// the walk never dead-ends.
    fn find_cycle(&self, waiting: &[usize]) -> Vec<usize> {
        let unplaced = |node: &usize| waiting[*node] > 0;
        let mut path = Vec::new();
        let mut seen = vec![None; waiting.len()];
        let mut node = (0..waiting.len()).find(unplaced).unwrap_or_default();
        loop {
            if let Some(start) = seen[node] {
                let mut cycle = path.split_off(start);
                cycle.push(node);
                return cycle;
            }
            seen[node] = Some(path.len());
            path.push(node);
            match self.upstream[node].iter().copied().find(unplaced) {
                Some(next) => node = next,
                None => return path,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn graph(len: usize, edges: &[(usize, usize)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new(len);
        for &(node, upstream) in edges {
            graph.add(node, upstream);
        }
        graph
    }

    #[test]
    fn independent_nodes_keep_registration_order() {
        assert_eq!(graph(4, &[]).topological_order(), Ok(vec![0, 1, 2, 3]));
    }

    #[test]
    fn dependents_follow_their_upstream() {
        // 0 after 2, 1 after 0
        let order = graph(3, &[(0, 2), (1, 0)]).topological_order();
        assert_eq!(order, Ok(vec![2, 0, 1]));
    }

    #[test]
    fn lowest_ready_node_goes_first() {
        let order = graph(4, &[(0, 3), (2, 3)]).topological_order();
        assert_eq!(order, Ok(vec![1, 3, 0, 2]));
    }

    #[test]
    fn two_node_cycle_is_named() {
        let cycle = graph(3, &[(0, 1), (1, 0)]).topological_order();
        assert_eq!(cycle, Err(vec![0, 1, 0]));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        assert_eq!(graph(2, &[(1, 1)]).topological_order(), Err(vec![1, 1]));
    }

    #[test]
    fn cycle_behind_a_tail_excludes_the_tail() {
        // 0 waits on the 1 <-> 2 loop but is not part of it
        let cycle = graph(3, &[(0, 1), (1, 2), (2, 1)]).topological_order();
        assert_eq!(cycle, Err(vec![1, 2, 1]));
    }

    #[test]
    fn declared_hints_are_listed_in_order() {
        let deps = Dependencies::new()
            .declare("outcome", ["sick"])
            .declare("population", vec!["susceptible", "infected"]);
        let collected: Vec<_> = deps.iter().collect();
        assert_eq!(deps.len(), 2);
        assert_eq!(collected[0], ("outcome", &["sick".to_string()][..]));
        assert_eq!(collected[1].1.len(), 2);
        assert!(Dependencies::new().is_empty());
    }

    /// Random DAG: every edge points from a higher position to a lower one in
    /// a shuffled labelling, so no cycle is possible.
    fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (2usize..24).prop_flat_map(|len| {
            let labels = Just((0..len).collect::<Vec<_>>()).prop_shuffle();
            let edges = prop::collection::vec((0..len, 0..len), 0..len * 2);
            (Just(len), labels, edges).prop_map(|(len, labels, edges)| {
                let edges = edges
                    .into_iter()
                    .filter(|(a, b)| a > b)
                    .map(|(a, b)| (labels[a], labels[b]))
                    .collect();
                (len, edges)
            })
        })
    }

    proptest! {
        #[test]
        fn order_is_deterministic_and_respects_edges((len, edges) in dag()) {
            let g = graph(len, &edges);
            let first = g.topological_order();
            prop_assert!(first.is_ok());
            prop_assert_eq!(&first, &g.topological_order());

            let order = first.unwrap_or_default();
            let mut position = vec![0; len];
            for (i, node) in order.iter().enumerate() {
                position[*node] = i;
            }
            for node in 0..len {
                for up in g.upstream(node) {
                    prop_assert!(position[up] < position[node]);
                }
            }
        }
    }
}
