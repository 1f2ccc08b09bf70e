//! Proofchain link audit
//!
//! Entries form an append-only list: each `parent_hash` must equal the
//! previous entry's `hash`, and the first must carry the genesis parent.
//! Broken links are reported as data so the rest of the chain stays
//! inspectable.

use serde::Serialize;
use tracing::debug;

use crate::types::hex32;
use crate::{Hash32, ProofChainEntry};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LinkStatus {
    /// First entry, parent is the genesis sentinel
    Genesis,
    Linked,
    /// First entry of an audit that starts mid-chain; not judged
    Unanchored,
    Broken {
        #[serde(with = "hex32")]
        expected: Hash32,
        #[serde(with = "hex32")]
        found: Hash32,
    },
}

impl LinkStatus {
    pub fn is_broken(&self) -> bool {
        matches!(self, LinkStatus::Broken { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LinkResult {
    pub proofchain_id: String,
    pub status: LinkStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChainAudit {
    pub consistent: bool,
    pub links: Vec<LinkResult>,
    /// Position (not id) of the first broken entry
    pub first_broken_link: Option<usize>,
}

pub fn link_status(
    entry: &ProofChainEntry,
    previous: Option<&ProofChainEntry>,
    genesis_parent: &Hash32,
) -> LinkStatus {
    let (expected, on_match) = match previous {
        Some(prev) => (prev.hash, LinkStatus::Linked),
        None => (*genesis_parent, LinkStatus::Genesis),
    };
    if entry.parent_hash == expected {
        on_match
    } else {
        LinkStatus::Broken { expected, found: entry.parent_hash }
    }
}

pub fn audit(entries: &[ProofChainEntry], genesis_parent: &Hash32, anchored: bool) -> ChainAudit {
    let mut links = Vec::with_capacity(entries.len());
    let mut first_broken_link = None;
    let mut prev: Option<&ProofChainEntry> = None;

    for (pos, entry) in entries.iter().enumerate() {
        let status = if prev.is_none() && !anchored {
            LinkStatus::Unanchored
        } else {
            link_status(entry, prev, genesis_parent)
        };

        if status.is_broken() {
            debug!(position = pos, proofchain_id = %entry.proofchain_id, "proofchain link broken");
            first_broken_link.get_or_insert(pos);
        }

        links.push(LinkResult {
            proofchain_id: entry.proofchain_id.clone(),
            status,
        });
        prev = Some(entry);
    }

    ChainAudit {
        consistent: first_broken_link.is_none(),
        links,
        first_broken_link,
    }
}
