use crate::config::NeatConfig;
use crate::topology;
use flapper_data::{Connection, Genome, Node, NodeType};
use rand::Rng;

pub fn mutate<R: Rng>(genome: &mut Genome, config: &NeatConfig, rng: &mut R) {
    if rng.gen::<f32>() < config.node_add_prob {
        mutate_add_node(genome, rng);
    }
    if rng.gen::<f32>() < config.conn_add_prob {
        mutate_add_connection(genome, config, rng);
    }
    if rng.gen::<f32>() < config.conn_delete_prob {
        mutate_delete_connection(genome, rng);
    }

    let limit = config.weight_limit;
    let init = config.weight_init_range;

    for conn in &mut genome.connections {
        if rng.gen::<f32>() < config.weight_mutate_rate {
            if rng.gen::<f32>() < config.weight_replace_rate {
                conn.weight = rng.gen_range(-init..init);
            } else if config.weight_mutate_power > 0.0 {
                let power = config.weight_mutate_power;
                conn.weight += rng.gen_range(-power..power);
            }
            conn.weight = conn.weight.clamp(-limit, limit);
        }
        if rng.gen::<f32>() < config.enabled_mutate_rate {
            conn.enabled = !conn.enabled;
        }
    }

    for node in genome
        .nodes
        .iter_mut()
        .filter(|n| n.node_type != NodeType::Input)
    {
        if rng.gen::<f32>() < config.bias_mutate_rate && config.bias_mutate_power > 0.0 {
            let power = config.bias_mutate_power;
            node.bias = (node.bias + rng.gen_range(-power..power)).clamp(-limit, limit);
        }
    }

    topology::disable_cycles(&mut genome.connections);
    topology::initialize_node_idx_map(genome);
}

/// Splits a random enabled connection `a -> b` into `a -> new -> b`.
pub fn mutate_add_node<R: Rng>(genome: &mut Genome, rng: &mut R) {
    let enabled: Vec<usize> = genome
        .connections
        .iter()
        .enumerate()
        .filter(|(_, c)| c.enabled)
        .map(|(i, _)| i)
        .collect();
    if enabled.is_empty() {
        return;
    }

    let idx = enabled[rng.gen_range(0..enabled.len())];
    let from = genome.connections[idx].from;
    let to = genome.connections[idx].to;
    let weight = genome.connections[idx].weight;
    let new_id = topology::get_split_node_id(from, to);

    if genome.nodes.iter().any(|n| n.id == new_id) {
        return;
    }

    genome.connections[idx].enabled = false;
    genome.nodes.push(Node {
        id: new_id,
        node_type: NodeType::Hidden,
        bias: 0.0,
        label: None,
    });
    genome.connections.push(Connection {
        from,
        to: new_id,
        weight: 1.0,
        enabled: true,
        innovation: topology::get_innovation_id(from, new_id),
    });
    genome.connections.push(Connection {
        from: new_id,
        to,
        weight,
        enabled: true,
        innovation: topology::get_innovation_id(new_id, to),
    });
}

/// Adds a connection between two unconnected nodes without creating a cycle.
pub fn mutate_add_connection<R: Rng>(genome: &mut Genome, config: &NeatConfig, rng: &mut R) {
    if genome.nodes.is_empty() {
        return;
    }

    let from_node = &genome.nodes[rng.gen_range(0..genome.nodes.len())];
    let to_node = &genome.nodes[rng.gen_range(0..genome.nodes.len())];
    if from_node.node_type == NodeType::Output || to_node.node_type == NodeType::Input {
        return;
    }

    let (from, to) = (from_node.id, to_node.id);
    let innovation = topology::get_innovation_id(from, to);

    if let Some(existing) = genome
        .connections
        .iter()
        .position(|c| c.innovation == innovation)
    {
        if !genome.connections[existing].enabled
            && !topology::creates_cycle(&genome.connections, from, to)
        {
            genome.connections[existing].enabled = true;
        }
        return;
    }

    if topology::creates_cycle(&genome.connections, from, to) {
        return;
    }

    let range = config.weight_init_range;
    genome.connections.push(Connection {
        from,
        to,
        weight: rng.gen_range(-range..range),
        enabled: true,
        innovation,
    });
}

pub fn mutate_delete_connection<R: Rng>(genome: &mut Genome, rng: &mut R) {
    if genome.connections.len() <= 1 {
        return;
    }
    let idx = rng.gen_range(0..genome.connections.len());
    genome.connections.remove(idx);

    // Drop hidden nodes nothing references any more.
    let referenced: std::collections::HashSet<usize> = genome
        .connections
        .iter()
        .flat_map(|c| [c.from, c.to])
        .collect();
    genome
        .nodes
        .retain(|n| n.node_type != NodeType::Hidden || referenced.contains(&n.id));
}
