use flapper_data::{Activations, Genome, NodeType};

pub fn forward(genome: &Genome, inputs: &[f32]) -> Vec<f32> {
    let mut activations = Activations::default();
    let mut outputs = Vec::new();
    forward_internal(genome, inputs, &mut activations, &mut outputs);
    outputs
}

/// Evaluates `genome` on `inputs`, writing one tanh-activated value per output
/// node into `outputs` in output id order. Inputs beyond the genome's arity are
/// ignored; missing inputs read as zero.
pub fn forward_internal(
    genome: &Genome,
    inputs: &[f32],
    activations: &mut Activations,
    outputs: &mut Vec<f32>,
) {
    outputs.clear();
    let num_inputs = genome.input_count();
    let num_outputs = genome.output_count();

    if genome.node_idx_map.is_empty() {
        outputs.resize(num_outputs, 0.0);
        return;
    }

    activations.prepare(genome.nodes.len());
    let values = &mut activations.0;

    for &node_idx in &genome.eval_order {
        let node = &genome.nodes[node_idx];

        if node.node_type == NodeType::Input {
            values[node_idx] = inputs.get(node.id).copied().unwrap_or(0.0);
            continue;
        }

        let mut sum = node.bias;
        if node_idx + 1 < genome.incoming_offsets.len() {
            let start = genome.incoming_offsets[node_idx];
            let end = genome.incoming_offsets[node_idx + 1];
            for &(from_idx, conn_idx) in &genome.incoming_flat[start..end] {
                sum += values[from_idx] * genome.connections[conn_idx].weight;
            }
        }
        values[node_idx] = sum.tanh();
    }

    for o in 0..num_outputs {
        let value = genome
            .node_idx_map
            .get(&(num_inputs + o))
            .map_or(0.0, |&idx| values[idx]);
        outputs.push(value);
    }
}
