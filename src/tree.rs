//! The branch-exit tree store: arrays indexed by exit-id holding parent,
//! children, prefix, and the exit-to-prefix-index map. Loaded once from the
//! compiler pass's artifacts and immutable thereafter.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::config::Config;
use crate::error::RuntimeError;

/// Hard ceiling on `2 * brCount`; implementations must detect and fail
/// rather than silently overrun fixed-size arrays.
pub const MAXN: i64 = 100_000;

/// The forest of branch exits produced by `initialize_runtime`.
///
/// Exit ids are dense: `0..br_count` are true exits, `br_count..2*br_count`
/// are false exits. `reverse(e)` flips between the two halves.
pub struct BranchTree {
    br_count: i32,
    arg_count: i32,
    parent: Vec<i32>,
    children: Vec<Vec<i32>>,
    prefix: Vec<Vec<i32>>,
    prefix_index: Vec<HashMap<i32, usize>>,
}

impl BranchTree {
    /// Loads `instrumentation_meta.txt` and `edges.txt` from `config`,
    /// builds the parent/children arrays, then computes every exit's
    /// prefix and prefix-index map.
    pub fn load(config: &Config) -> Result<Self, RuntimeError> {
        let (br_count, arg_count) = read_meta(&config.meta_path())?;
        let total = 2 * i64::from(br_count);
        if total > MAXN {
            return Err(RuntimeError::TooManyExits { got: total, max: MAXN });
        }

        let total = total as usize;
        let mut parent: Vec<i32> = (0..total as i32).collect();
        let mut children: Vec<Vec<i32>> = vec![Vec::new(); total];

        for (index, (from, to)) in read_edges(&config.edges_path())?.into_iter().enumerate() {
            if from < 0 || from as usize >= total || to < 0 || to as usize >= total {
                return Err(RuntimeError::MalformedEdges {
                    path: config.edges_path(),
                    index,
                    reason: format!("exit id out of range 0..{total}"),
                });
            }
            // Duplicates overwrite: detach `to` from whatever parent it had
            // before, since "the last parent wins".
            let old_parent = parent[to as usize] as usize;
            if old_parent != to as usize {
                children[old_parent].retain(|&c| c != to);
            }
            parent[to as usize] = from;
            children[from as usize].push(to);
        }

        let mut prefix = Vec::with_capacity(total);
        let mut prefix_index = Vec::with_capacity(total);
        for exit in 0..total as i32 {
            let path = walk_prefix(exit, &parent)?;
            let mut index = HashMap::with_capacity(path.len());
            for (i, &node) in path.iter().enumerate() {
                index.insert(node, i);
            }
            prefix.push(path);
            prefix_index.push(index);
        }

        Ok(Self {
            br_count,
            arg_count,
            parent,
            children,
            prefix,
            prefix_index,
        })
    }

    #[must_use]
    pub fn br_count(&self) -> i32 {
        self.br_count
    }

    #[must_use]
    pub fn arg_count(&self) -> i32 {
        self.arg_count
    }

    #[must_use]
    pub fn exit_count(&self) -> usize {
        self.parent.len()
    }

    /// The reverse exit: flips `e` between its true/false half.
    #[must_use]
    pub fn reverse(&self, exit: i32) -> i32 {
        if exit < self.br_count {
            exit + self.br_count
        } else {
            exit - self.br_count
        }
    }

    #[must_use]
    pub fn is_valid(&self, exit: i32) -> bool {
        exit >= 0 && (exit as usize) < self.parent.len()
    }

    #[must_use]
    pub fn depth(&self, exit: i32) -> usize {
        self.prefix.get(exit as usize).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn prefix(&self, exit: i32) -> &[i32] {
        self.prefix.get(exit as usize).map_or(&[], Vec::as_slice)
    }

    /// Position of `needle` on `exit`'s prefix, if present.
    #[must_use]
    pub fn prefix_position(&self, exit: i32, needle: i32) -> Option<usize> {
        self.prefix_index.get(exit as usize)?.get(&needle).copied()
    }

    #[must_use]
    pub fn parent_of(&self, exit: i32) -> i32 {
        self.parent.get(exit as usize).copied().unwrap_or(-1)
    }

    #[must_use]
    pub fn children_count(&self, exit: i32) -> usize {
        self.children.get(exit as usize).map_or(0, Vec::len)
    }

    #[must_use]
    pub fn child(&self, exit: i32, index: usize) -> i32 {
        self.children
            .get(exit as usize)
            .and_then(|c| c.get(index))
            .copied()
            .unwrap_or(-1)
    }
}

fn read_meta(path: &Path) -> Result<(i32, i32), RuntimeError> {
    let contents = std::fs::read_to_string(path).map_err(|source| RuntimeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut numbers = contents.split_ascii_whitespace();
    let malformed = |reason: &str| RuntimeError::MalformedMeta {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let br_count: i32 = numbers
        .next()
        .ok_or_else(|| malformed("missing brCount"))?
        .parse()
        .map_err(|_| malformed("brCount is not an integer"))?;
    let arg_count: i32 = numbers
        .next()
        .ok_or_else(|| malformed("missing argCount"))?
        .parse()
        .map_err(|_| malformed("argCount is not an integer"))?;
    if br_count < 0 {
        return Err(malformed("brCount must be non-negative"));
    }
    Ok((br_count, arg_count))
}

fn read_edges(path: &Path) -> Result<Vec<(i32, i32)>, RuntimeError> {
    let contents = std::fs::read_to_string(path).map_err(|source| RuntimeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut tokens = contents.split_ascii_whitespace();
    let mut edges = Vec::new();
    let mut index = 0;
    loop {
        let Some(first) = tokens.next() else { break };
        let second = tokens.next().ok_or_else(|| RuntimeError::MalformedEdges {
            path: path.to_path_buf(),
            index,
            reason: "trailing token without a pair".to_string(),
        })?;
        let from: i32 = first.parse().map_err(|_| RuntimeError::MalformedEdges {
            path: path.to_path_buf(),
            index,
            reason: format!("`{first}` is not an integer"),
        })?;
        let to: i32 = second.parse().map_err(|_| RuntimeError::MalformedEdges {
            path: path.to_path_buf(),
            index,
            reason: format!("`{second}` is not an integer"),
        })?;
        edges.push((from, to));
        index += 1;
    }
    Ok(edges)
}

/// Walks `parent` from `exit` to its root, detecting cycles along the way,
/// and returns the prefix in root-to-exit order.
fn walk_prefix(exit: i32, parent: &[i32]) -> Result<Vec<i32>, RuntimeError> {
    let mut path = Vec::new();
    let mut seen = HashSet::new();
    let mut current = exit;
    loop {
        if !seen.insert(current) {
            return Err(RuntimeError::Cycle(exit));
        }
        path.push(current);
        let next = parent[current as usize];
        if next == current {
            break;
        }
        current = next;
    }
    path.reverse();
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &Path, meta: &str, edges: &str) -> Config {
        std::fs::write(dir.join("instrumentation_meta.txt"), meta).unwrap();
        let mut f = std::fs::File::create(dir.join("edges.txt")).unwrap();
        write!(f, "{edges}").unwrap();
        Config::with_dir(dir)
    }

    #[test]
    fn s1_tree_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path(), "3 2", "0 1\n1 2\n");
        let tree = BranchTree::load(&config).unwrap();

        assert_eq!(tree.br_count(), 3);
        assert_eq!(tree.arg_count(), 2);
        assert_eq!(tree.parent_of(1), 0);
        assert_eq!(tree.parent_of(2), 1);
        assert_eq!(tree.parent_of(0), 0);
        assert_eq!(tree.prefix(2), &[0, 1, 2]);
        assert_eq!(tree.depth(2), 3);
        assert_eq!(tree.prefix_position(2, 0), Some(0));
        assert_eq!(tree.prefix_position(2, 1), Some(1));
        assert_eq!(tree.prefix_position(2, 2), Some(2));
    }

    #[test]
    fn duplicate_parent_entries_let_last_one_win() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path(), "2 0", "0 1\n2 1\n");
        let tree = BranchTree::load(&config).unwrap();
        assert_eq!(tree.parent_of(1), 2);
        assert_eq!(tree.children_count(0), 0);
        assert_eq!(tree.children_count(2), 1);
        assert_eq!(tree.child(2, 0), 1);
    }

    #[test]
    fn cycle_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path(), "2 0", "0 1\n1 0\n");
        let err = BranchTree::load(&config).unwrap_err();
        assert!(matches!(err, RuntimeError::Cycle(_)));
    }

    #[test]
    fn oversized_br_count_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path(), "60000 0", "");
        let err = BranchTree::load(&config).unwrap_err();
        assert!(matches!(err, RuntimeError::TooManyExits { .. }));
    }

    #[test]
    fn out_of_range_introspection_returns_sentinels() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path(), "3 0", "0 1\n");
        let tree = BranchTree::load(&config).unwrap();
        assert_eq!(tree.parent_of(999), -1);
        assert_eq!(tree.children_count(999), 0);
        assert_eq!(tree.child(0, 999), -1);
    }

    #[test]
    fn reverse_flips_true_false_halves() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_fixture(dir.path(), "3 0", "");
        let tree = BranchTree::load(&config).unwrap();
        assert_eq!(tree.reverse(0), 3);
        assert_eq!(tree.reverse(3), 0);
    }
}
