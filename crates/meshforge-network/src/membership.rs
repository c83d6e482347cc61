//! Address book of the mesh.

use std::{collections::BTreeMap, sync::Arc};

use meshforge_core::Mailbox;
use meshforge_proto::NodeId;

/// Immutable snapshot of which nodes exist and how to reach them.
///
/// The registry builds a fresh snapshot on every topology change and hands
/// the same `Arc` to every transport. Entries are mailboxes rather than
/// transports, so a node can enqueue into a peer but never touch its state.
/// Members are kept sorted: broadcasts walk them in this order, and a seeded
/// environment only replays when its draws land on the same links.
#[derive(Debug, Clone, Default)]
pub struct Membership {
    mailboxes: Arc<BTreeMap<NodeId, Mailbox>>,
}

impl Membership {
    /// Mailbox of `node_id`, if it is a member.
    pub fn get(&self, node_id: &str) -> Option<&Mailbox> {
        self.mailboxes.get(node_id)
    }

    /// Whether `node_id` is a member.
    pub fn contains(&self, node_id: &str) -> bool {
        self.mailboxes.contains_key(node_id)
    }

    /// Member IDs, in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.mailboxes.keys()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.mailboxes.len()
    }

    /// Whether there are no members.
    pub fn is_empty(&self) -> bool {
        self.mailboxes.is_empty()
    }
}

impl FromIterator<(NodeId, Mailbox)> for Membership {
    fn from_iter<I: IntoIterator<Item = (NodeId, Mailbox)>>(iter: I) -> Self {
        Self { mailboxes: Arc::new(iter.into_iter().collect()) }
    }
}
