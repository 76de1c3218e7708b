//! RFC 6962 Merkle tree inclusion proof verification
//!
//! Transparency logs commit to their contents with an RFC 6962 Merkle tree
//! and sign the root. An inclusion proof (audit path) lets a verifier that
//! only holds one leaf recompute that root.
//!
//! # RFC 6962 Hash Computation
//!
//! **Leaf Hash**: `SHA-256(0x00 || leaf_data)`
//!
//! **Interior Node Hash**: `SHA-256(0x01 || left_child || right_child)`
//!
//! The two prefixes keep leaf and interior hashes in disjoint domains, so a
//! crafted leaf can never be passed off as an interior node.
//!
//! # Audit path layout
//!
//! For a leaf at `leaf_index` in a tree of `tree_size` leaves the path splits
//! into two parts (RFC 9162, section 2.1.3.2):
//!
//! - `inner = bit_length(leaf_index ^ (tree_size - 1))` hashes below the
//!   point where the leaf's path leaves the right border of the tree. Their
//!   side is given by the bits of `leaf_index`.
//! - `border = popcount(leaf_index >> inner)` hashes along the right border,
//!   which are always left siblings.
//!
//! [`inclusion_path_len`] is the one definition of the path length, shared
//! by the descriptor parser and the verifier.

use crate::ct::ct_eq;
use crate::hash::{Digest, Hash};

/// RFC 6962 domain separator for leaf nodes
pub const LEAF_PREFIX: u8 = 0x00;

/// RFC 6962 domain separator for interior nodes
pub const NODE_PREFIX: u8 = 0x01;

/// Compute RFC 6962 leaf hash
pub fn compute_leaf_hash(data: &[u8]) -> Digest {
    let mut hasher = Hash::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    hasher.finalize()
}

/// Compute RFC 6962 interior node hash
pub fn compute_node_hash(left: &Digest, right: &Digest) -> Digest {
    let mut hasher = Hash::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize()
}

fn bit_length(n: u64) -> u32 {
    u64::BITS - n.leading_zeros()
}

/// Split an audit path into its inner and right-border parts.
///
/// Returns `None` when `leaf_index` is not a valid position in the tree.
fn decompose_path(leaf_index: u64, tree_size: u64) -> Option<(usize, usize)> {
    if tree_size == 0 || leaf_index >= tree_size {
        return None;
    }
    let inner = bit_length(leaf_index ^ (tree_size - 1));
    let border = leaf_index.checked_shr(inner).unwrap_or(0).count_ones();
    Some((inner as usize, border as usize))
}

/// Number of hashes in the audit path of `leaf_index` in a tree of
/// `tree_size` leaves, or `None` if the position is invalid.
pub fn inclusion_path_len(leaf_index: u64, tree_size: u64) -> Option<usize> {
    decompose_path(leaf_index, tree_size).map(|(inner, border)| inner + border)
}

/// Recompute the tree root from a leaf hash and its audit path.
///
/// Returns `None` if the position is invalid or the path has the wrong
/// length for it.
pub fn root_from_inclusion_proof(
    leaf_hash: &Digest,
    leaf_index: u64,
    tree_size: u64,
    audit_path: &[Digest],
) -> Option<Digest> {
    let (inner, border) = decompose_path(leaf_index, tree_size)?;
    if audit_path.len() != inner + border {
        return None;
    }

    let mut current_hash = *leaf_hash;
    for (level, sibling) in audit_path[..inner].iter().enumerate() {
        current_hash = if (leaf_index >> level) & 1 == 0 {
            compute_node_hash(&current_hash, sibling)
        } else {
            compute_node_hash(sibling, &current_hash)
        };
    }
    for sibling in &audit_path[inner..] {
        current_hash = compute_node_hash(sibling, &current_hash);
    }
    Some(current_hash)
}

/// Verify a Merkle tree inclusion proof according to RFC 6962
///
/// # Arguments
/// * `leaf_hash` - RFC 6962 hash of the leaf
/// * `leaf_index` - Index of the leaf in the tree (0-based)
/// * `tree_size` - Total number of leaves in the tree
/// * `audit_path` - Sibling hashes ordered from leaf to root
/// * `claimed_root` - Root hash the log committed to
///
/// Returns `false` on any mismatch, including an out-of-range index or a
/// path of the wrong length. The final root comparison is constant time.
pub fn verify_inclusion(
    leaf_hash: &Digest,
    leaf_index: u64,
    tree_size: u64,
    audit_path: &[Digest],
    claimed_root: &Digest,
) -> bool {
    match root_from_inclusion_proof(leaf_hash, leaf_index, tree_size, audit_path) {
        Some(computed) => ct_eq(&computed, claimed_root),
        None => {
            log::debug!(
                "Malformed inclusion proof: leaf {} of {} with {} hashes",
                leaf_index,
                tree_size,
                audit_path.len()
            );
            false
        }
    }
}

/// Find the largest power of 2 less than n
///
/// For example: n=7 returns 4, n=5 returns 4, n=8 returns 4, n=9 returns 8
fn largest_power_of_two_less_than(n: u64) -> u64 {
    if n <= 1 {
        return n;
    }
    1u64 << (bit_length(n - 1) - 1)
}

/// In-memory RFC 6962 tree, used to author inclusion proofs.
///
/// Computes `MTH(D[n])` and `PATH(m, D[n])` directly from the RFC
/// definitions. It holds every leaf hash and is meant for tooling and
/// tests, not for the verification path.
#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    leaves: Vec<Digest>,
}

impl MerkleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from raw leaf data.
    pub fn from_leaves<I, T>(leaves: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        Self {
            leaves: leaves
                .into_iter()
                .map(|leaf| compute_leaf_hash(leaf.as_ref()))
                .collect(),
        }
    }

    /// Append raw leaf data, returning its index.
    pub fn push(&mut self, leaf: &[u8]) -> u64 {
        self.leaves.push(compute_leaf_hash(leaf));
        (self.leaves.len() - 1) as u64
    }

    pub fn len(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn leaf_hash(&self, index: u64) -> Option<Digest> {
        self.leaves.get(usize::try_from(index).ok()?).copied()
    }

    /// Root hash of the whole tree. The empty tree hashes to `SHA-256("")`.
    pub fn root(&self) -> Digest {
        if self.leaves.is_empty() {
            return Hash::new().finalize();
        }
        Self::subtree_root(&self.leaves)
    }

    /// Audit path for the leaf at `index`, ordered from leaf to root.
    pub fn inclusion_path(&self, index: u64) -> Option<Vec<Digest>> {
        let index = usize::try_from(index).ok()?;
        if index >= self.leaves.len() {
            return None;
        }
        let mut path = Vec::new();
        Self::subtree_path(index, &self.leaves, &mut path);
        Some(path)
    }

    fn split_point(n: usize) -> usize {
        largest_power_of_two_less_than(n as u64) as usize
    }

    fn subtree_root(leaves: &[Digest]) -> Digest {
        if leaves.len() == 1 {
            return leaves[0];
        }
        let k = Self::split_point(leaves.len());
        compute_node_hash(
            &Self::subtree_root(&leaves[..k]),
            &Self::subtree_root(&leaves[k..]),
        )
    }

    fn subtree_path(index: usize, leaves: &[Digest], path: &mut Vec<Digest>) {
        if leaves.len() <= 1 {
            return;
        }
        let k = Self::split_point(leaves.len());
        if index < k {
            Self::subtree_path(index, &leaves[..k], path);
            path.push(Self::subtree_root(&leaves[k..]));
        } else {
            Self::subtree_path(index - k, &leaves[k..], path);
            path.push(Self::subtree_root(&leaves[..k]));
        }
    }
}
