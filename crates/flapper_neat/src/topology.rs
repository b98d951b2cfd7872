use crate::config::NeatConfig;
use flapper_data::{Connection, Genome, GenomeKey, Node, NodeType};
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Input nodes take ids `0..num_inputs`, outputs follow immediately after.
/// Hidden nodes get hashed ids from [`get_split_node_id`], always `>= 1000`.
pub fn create_genome_random_with_rng<R: Rng>(
    key: GenomeKey,
    config: &NeatConfig,
    rng: &mut R,
) -> Genome {
    let range = config.weight_init_range;
    let mut nodes = Vec::with_capacity(config.num_inputs + config.num_outputs);

    for i in 0..config.num_inputs {
        nodes.push(Node {
            id: i,
            node_type: NodeType::Input,
            bias: 0.0,
            label: Some(format!("in{i}")),
        });
    }

    for o in 0..config.num_outputs {
        nodes.push(Node {
            id: config.num_inputs + o,
            node_type: NodeType::Output,
            bias: rng.gen_range(-range..range),
            label: Some(format!("out{o}")),
        });
    }

    let mut connections = Vec::with_capacity(config.num_inputs * config.num_outputs);
    for i in 0..config.num_inputs {
        for o in config.num_inputs..config.num_inputs + config.num_outputs {
            connections.push(Connection {
                from: i,
                to: o,
                weight: rng.gen_range(-range..range),
                enabled: true,
                innovation: get_innovation_id(i, o),
            });
        }
    }

    let mut genome = Genome {
        key,
        nodes,
        connections,
        fitness: None,
        node_idx_map: HashMap::new(),
        eval_order: Vec::new(),
        incoming_flat: Vec::new(),
        incoming_offsets: Vec::new(),
    };
    initialize_node_idx_map(&mut genome);
    genome
}

/// Innovation numbers are a hash of the endpoints, so the same structural
/// change gets the same number in every genome without a global registry.
pub fn get_innovation_id(from: usize, to: usize) -> usize {
    let h = (from as u64) << 32 | (to as u64);
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for byte in h.to_le_bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3_u64);
    }
    (hash as usize) & 0x7FFF_FFFF
}

pub fn get_split_node_id(from: usize, to: usize) -> usize {
    let h = (from as u64) << 32 | (to as u64);
    let mut hash = 0x8422_2325_cbf2_9ce4_u64;
    for byte in h.to_le_bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3_u64);
    }
    (hash as usize % 1_000_000) + 1000
}

/// Returns true if adding `from -> to` would close a loop over enabled connections.
pub fn creates_cycle(connections: &[Connection], from: usize, to: usize) -> bool {
    if from == to {
        return true;
    }

    let mut visited = HashSet::from([to]);
    let mut frontier = vec![to];
    while let Some(node) = frontier.pop() {
        for conn in connections.iter().filter(|c| c.enabled && c.from == node) {
            if conn.to == from {
                return true;
            }
            if visited.insert(conn.to) {
                frontier.push(conn.to);
            }
        }
    }
    false
}

/// Disables any enabled connection that closes a loop with the others.
/// Re-enabled genes from mutation or crossover are the only source of these.
pub fn disable_cycles(connections: &mut [Connection]) {
    for idx in 0..connections.len() {
        if !connections[idx].enabled {
            continue;
        }
        let (from, to) = (connections[idx].from, connections[idx].to);
        connections[idx].enabled = false;
        if !creates_cycle(connections, from, to) {
            connections[idx].enabled = true;
        }
    }
}

pub fn initialize_node_idx_map(genome: &mut Genome) {
    genome.node_idx_map.clear();
    for (idx, node) in genome.nodes.iter().enumerate() {
        genome.node_idx_map.insert(node.id, idx);
    }

    for conn in &mut genome.connections {
        if !genome.node_idx_map.contains_key(&conn.from)
            || !genome.node_idx_map.contains_key(&conn.to)
        {
            conn.enabled = false;
        }
    }

    let mut adj: HashMap<usize, Vec<usize>> = HashMap::new();
    for conn in genome.connections.iter().filter(|c| c.enabled) {
        adj.entry(conn.from).or_default().push(conn.to);
    }

    fn dfs(
        u: usize,
        adj: &HashMap<usize, Vec<usize>>,
        visited: &mut HashSet<usize>,
        order: &mut Vec<usize>,
    ) {
        visited.insert(u);
        if let Some(neighbors) = adj.get(&u) {
            for &v in neighbors {
                if !visited.contains(&v) {
                    dfs(v, adj, visited, order);
                }
            }
        }
        order.push(u);
    }

    let mut order = Vec::with_capacity(genome.nodes.len());
    let mut visited = HashSet::new();
    for node in &genome.nodes {
        if !visited.contains(&node.id) {
            dfs(node.id, &adj, &mut visited, &mut order);
        }
    }
    order.reverse();

    let ranks: HashMap<usize, usize> = order
        .iter()
        .enumerate()
        .map(|(rank, &id)| (id, rank))
        .collect();

    // Back edges are never expressed; mutation refuses to create them.
    let mut incoming: HashMap<usize, Vec<usize>> = HashMap::new();
    for (idx, conn) in genome.connections.iter().enumerate() {
        if !conn.enabled {
            continue;
        }
        let from_rank = ranks.get(&conn.from).copied().unwrap_or(0);
        let to_rank = ranks.get(&conn.to).copied().unwrap_or(0);
        if from_rank < to_rank {
            incoming.entry(conn.to).or_default().push(idx);
        }
    }

    genome.eval_order = order
        .iter()
        .filter_map(|id| genome.node_idx_map.get(id).copied())
        .collect();

    let mut incoming_flat = Vec::new();
    let mut incoming_offsets = Vec::with_capacity(genome.nodes.len() + 1);
    incoming_offsets.push(0);
    for node in &genome.nodes {
        if let Some(conn_indices) = incoming.get(&node.id) {
            for &conn_idx in conn_indices {
                let from = genome.connections[conn_idx].from;
                if let Some(&from_idx) = genome.node_idx_map.get(&from) {
                    incoming_flat.push((from_idx, conn_idx));
                }
            }
        }
        incoming_offsets.push(incoming_flat.len());
    }

    genome.incoming_flat = incoming_flat;
    genome.incoming_offsets = incoming_offsets;
}
