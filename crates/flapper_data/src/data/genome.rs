use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a genome within a population.
pub type GenomeKey = u64;

/// Type of neural network node.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Input node (receives one observation slot).
    Input,
    /// Hidden node (internal processing).
    Hidden,
    /// Output node (one action score).
    Output,
}

/// A node in the network.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Unique node identifier.
    pub id: usize,
    /// Type of neural node.
    pub node_type: NodeType,
    /// Bias added before activation. Ignored for inputs.
    pub bias: f32,
    /// Optional descriptive label.
    pub label: Option<String>,
}

/// A connection gene between two nodes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    /// Source node ID.
    pub from: usize,
    /// Target node ID.
    pub to: usize,
    /// Connection weight.
    pub weight: f32,
    /// Whether connection is expressed.
    pub enabled: bool,
    /// Innovation number used to align genes during crossover.
    pub innovation: usize,
}

/// A NEAT genome: the evolvable description of one agent's policy network.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Genome {
    /// Population-unique key.
    pub key: GenomeKey,
    /// All nodes.
    pub nodes: Vec<Node>,
    /// All connection genes.
    pub connections: Vec<Connection>,
    /// Fitness assigned after evaluation, `None` until then.
    pub fitness: Option<f64>,
    /// Node ID to index mapping (not serialized).
    #[serde(skip, default = "HashMap::new")]
    pub node_idx_map: HashMap<usize, usize>,
    /// Node indices in evaluation order (not serialized).
    #[serde(skip, default = "Vec::new")]
    pub eval_order: Vec<usize>,
    /// Flattened `(from_idx, conn_idx)` incoming edges per node (not serialized).
    #[serde(skip, default = "Vec::new")]
    pub incoming_flat: Vec<(usize, usize)>,
    /// Offsets into `incoming_flat`, one past the end per node (not serialized).
    #[serde(skip, default = "Vec::new")]
    pub incoming_offsets: Vec<usize>,
}

impl Genome {
    #[must_use]
    pub fn input_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Input)
            .count()
    }

    #[must_use]
    pub fn output_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Output)
            .count()
    }

    #[must_use]
    pub fn hidden_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Hidden)
            .count()
    }

    #[must_use]
    pub fn enabled_connections(&self) -> usize {
        self.connections.iter().filter(|c| c.enabled).count()
    }

    /// Serialize genome to hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(bytes)
    }

    /// Deserialize genome from hex string. Caches must be rebuilt by the caller.
    pub fn from_hex(hex_str: &str) -> anyhow::Result<Self> {
        let bytes = hex::decode(hex_str)?;
        let genome = serde_json::from_slice(&bytes)?;
        Ok(genome)
    }
}

/// Network activation buffer, reused across ticks to avoid reallocating.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Activations(pub Vec<f32>);

impl Default for Activations {
    fn default() -> Self {
        Self(vec![0.0; 16])
    }
}

impl Activations {
    /// Prepare activation buffer for given node count.
    pub fn prepare(&mut self, node_count: usize) {
        if self.0.len() != node_count {
            self.0.clear();
            self.0.resize(node_count, 0.0);
        } else {
            self.0.fill(0.0);
        }
    }
}
