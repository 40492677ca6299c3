//! Partitioning of upload nodes into request-sized batches.
//!
//! The chunker and the estimator share one `BatchPlanner`, so the batch count
//! shown before an upload always matches the batches actually sent.

use crate::nodes::ApiNode;
use serde::Serialize;

pub const DEFAULT_MAX_NODES: usize = 100;
pub const DEFAULT_MAX_PAYLOAD_CHARS: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Target {
    #[serde(rename = "SCHEMA")]
    Schema,
    #[serde(rename = "INBOX")]
    Inbox,
}

/// Request body accepted by the Tana input API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<'a> {
    pub target_node_id: Target,
    pub nodes: &'a [ApiNode],
}

impl<'a> Envelope<'a> {
    pub fn new(target_node_id: Target, nodes: &'a [ApiNode]) -> Self {
        Self { target_node_id, nodes }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_nodes: usize,
    pub max_chars: usize,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self { max_nodes: DEFAULT_MAX_NODES, max_chars: DEFAULT_MAX_PAYLOAD_CHARS }
    }
}

/// Length in characters of the compact JSON form of `value`.
pub fn json_len<T: Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_string(value).map(|s| s.chars().count()).unwrap_or(usize::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Node joins the open batch.
    Append,
    /// Open batch is closed; node starts the next one.
    StartNew,
    /// Node can never fit a request and is dropped.
    Oversized,
}

/// Greedy forward-only boundary decisions, without holding any nodes.
#[derive(Debug, Clone)]
pub struct BatchPlanner {
    limits: BatchLimits,
    overhead: usize,
    count: usize,
    chars: usize,
}

impl BatchPlanner {
    pub fn new(limits: BatchLimits) -> Self {
        let overhead = json_len(&Envelope::new(Target::Inbox, &[]));
        Self { limits, overhead, count: 0, chars: overhead }
    }

    /// Places a node of `node_len` serialized characters.
    pub fn place(&mut self, node_len: usize) -> Placement {
        if self.overhead.saturating_add(node_len) > self.limits.max_chars {
            return Placement::Oversized;
        }
        if self.count == 0 {
            self.count = 1;
            self.chars = self.overhead + node_len;
            return Placement::Append;
        }
        let size_exceeded = self.chars + 1 + node_len > self.limits.max_chars;
        let count_exceeded = self.count + 1 > self.limits.max_nodes;
        if size_exceeded || count_exceeded {
            self.count = 1;
            self.chars = self.overhead + node_len;
            Placement::StartNew
        } else {
            self.count += 1;
            self.chars += 1 + node_len;
            Placement::Append
        }
    }

    pub fn has_open_batch(&self) -> bool {
        self.count > 0
    }
}

/// A node that was dropped because its request alone exceeds the size limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OversizedNode {
    pub index: usize,
    pub name: String,
    pub envelope_chars: usize,
    pub max_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of the first node of the batch in the input sequence.
    pub first_index: usize,
    pub nodes: Vec<ApiNode>,
}

impl Batch {
    pub fn envelope(&self) -> Envelope<'_> {
        Envelope::new(Target::Inbox, &self.nodes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Batch(Batch),
    Oversized(OversizedNode),
}

/// Lazily partitions nodes into batches; oversized nodes are reported in sequence.
pub struct BatchChunker<I: Iterator<Item = ApiNode>> {
    nodes: std::iter::Enumerate<I>,
    planner: BatchPlanner,
    open: Option<Batch>,
    overhead: usize,
}

impl<I: Iterator<Item = ApiNode>> BatchChunker<I> {
    pub fn new<T: IntoIterator<IntoIter = I>>(nodes: T, limits: BatchLimits) -> Self {
        let planner = BatchPlanner::new(limits);
        let overhead = planner.overhead;
        Self { nodes: nodes.into_iter().enumerate(), planner, open: None, overhead }
    }
}

impl<I: Iterator<Item = ApiNode>> Iterator for BatchChunker<I> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        for (index, node) in self.nodes.by_ref() {
            let len = json_len(&node);
            match self.planner.place(len) {
                Placement::Oversized => {
                    return Some(Chunk::Oversized(OversizedNode {
                        index,
                        name: node.name,
                        envelope_chars: self.overhead.saturating_add(len),
                        max_chars: self.planner.limits.max_chars,
                    }));
                }
                Placement::Append => match self.open.as_mut() {
                    Some(batch) => batch.nodes.push(node),
                    None => self.open = Some(Batch { first_index: index, nodes: vec![node] }),
                },
                Placement::StartNew => {
                    let done = self.open.replace(Batch { first_index: index, nodes: vec![node] });
                    if let Some(done) = done {
                        return Some(Chunk::Batch(done));
                    }
                }
            }
        }
        self.open.take().map(Chunk::Batch)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchEstimate {
    pub nodes: usize,
    pub batches: usize,
    pub oversized: usize,
}

/// Counts the batches `BatchChunker` would produce for the same input and limits.
pub fn estimate_batches(nodes: &[ApiNode], limits: BatchLimits) -> BatchEstimate {
    let mut planner = BatchPlanner::new(limits);
    let mut est = BatchEstimate { nodes: nodes.len(), ..Default::default() };
    for node in nodes {
        match planner.place(json_len(node)) {
            Placement::Oversized => est.oversized += 1,
            Placement::StartNew => est.batches += 1,
            Placement::Append => {}
        }
    }
    if planner.has_open_batch() {
        est.batches += 1;
    }
    est
}
