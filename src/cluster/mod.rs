pub mod jobs;

use crate::remote::Channel;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Name of a pool of worker nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Snapshot of a known node. Without a channel the node is offline.
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    labels: Vec<Label>,
    channel: Option<Arc<dyn Channel>>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn channel(&self) -> Option<Arc<dyn Channel>> {
        self.channel.clone()
    }

    pub fn is_online(&self) -> bool {
        self.channel.is_some()
    }

    /// A node always carries its own name as a label.
    pub fn has_label(&self, label: &Label) -> bool {
        self.name == label.name() || self.labels.contains(label)
    }
}

/// 节点注册表接口
pub trait NodeRegistry: Send + Sync {
    /// Nodes carrying `label`, in a stable order.
    fn nodes_for_label(&self, label: &Label) -> Vec<Node>;

    /// Channel of the first online node. No waiting, no retry.
    fn find_active_channel(&self, label: &Label) -> Option<Arc<dyn Channel>> {
        self.nodes_for_label(label).into_iter().find_map(|node| node.channel())
    }
}

#[derive(Debug)]
struct RegisteredNode {
    seq: u64,
    labels: Vec<Label>,
    channel: Option<Arc<dyn Channel>>,
}

/// Registry kept in memory; nodes are ordered by registration.
#[derive(Debug, Default)]
pub struct InMemoryNodeRegistry {
    nodes: DashMap<String, RegisteredNode>,
    next_seq: AtomicU64,
}

impl InMemoryNodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or relabels a node. A re-added node keeps its channel and position.
    pub fn add_node(&self, name: &str, labels: Vec<Label>) {
        if let Some(mut existing) = self.nodes.get_mut(name) {
            existing.labels = labels;
            return;
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.nodes.insert(
            name.to_string(),
            RegisteredNode {
                seq,
                labels,
                channel: None,
            },
        );
    }

    pub fn remove_node(&self, name: &str) -> bool {
        self.nodes.remove(name).is_some()
    }

    /// Brings a node online. Returns `false` for an unknown node.
    pub fn connect(&self, name: &str, channel: Arc<dyn Channel>) -> bool {
        match self.nodes.get_mut(name) {
            Some(mut node) => {
                node.channel = Some(channel);
                true
            }
            None => false,
        }
    }

    pub fn disconnect(&self, name: &str) -> Option<Arc<dyn Channel>> {
        self.nodes.get_mut(name).and_then(|mut node| node.channel.take())
    }

    pub fn node(&self, name: &str) -> Option<Node> {
        self.nodes.get(name).map(|entry| Node {
            name: entry.key().clone(),
            labels: entry.labels.clone(),
            channel: entry.channel.clone(),
        })
    }
}

impl NodeRegistry for InMemoryNodeRegistry {
    fn nodes_for_label(&self, label: &Label) -> Vec<Node> {
        let mut matching: Vec<(u64, Node)> = self
            .nodes
            .iter()
            .map(|entry| {
                let node = Node {
                    name: entry.key().clone(),
                    labels: entry.labels.clone(),
                    channel: entry.channel.clone(),
                };
                (entry.seq, node)
            })
            .filter(|(_, node)| node.has_label(label))
            .collect();
        matching.sort_by_key(|(seq, _)| *seq);
        matching.into_iter().map(|(_, node)| node).collect()
    }
}
