use crate::topology;
use flapper_data::{Genome, GenomeKey, Node};
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Chance that a gene disabled in either parent stays disabled in the child.
const INHERIT_DISABLED_PROB: f64 = 0.75;

/// Matching genes are picked from either parent at random; disjoint and
/// excess genes come from `fitter` only.
pub fn genome_crossover_with_rng<R: Rng>(
    fitter: &Genome,
    other: &Genome,
    child_key: GenomeKey,
    rng: &mut R,
) -> Genome {
    let other_genes: HashMap<usize, _> = other
        .connections
        .iter()
        .map(|c| (c.innovation, c))
        .collect();

    let mut child_connections = Vec::with_capacity(fitter.connections.len());
    for c1 in &fitter.connections {
        let mut gene = match other_genes.get(&c1.innovation) {
            Some(c2) => {
                let mut gene = if rng.gen_bool(0.5) {
                    c1.clone()
                } else {
                    (*c2).clone()
                };
                if !c1.enabled || !c2.enabled {
                    gene.enabled = !rng.gen_bool(INHERIT_DISABLED_PROB);
                }
                gene
            }
            None => c1.clone(),
        };
        // Matching innovations share endpoints, so only the weight can differ.
        gene.from = c1.from;
        gene.to = c1.to;
        child_connections.push(gene);
    }

    let other_nodes: HashMap<usize, &Node> = other.nodes.iter().map(|n| (n.id, n)).collect();
    let mut child_nodes: Vec<Node> = fitter
        .nodes
        .iter()
        .map(|n| match other_nodes.get(&n.id) {
            Some(o) if rng.gen_bool(0.5) => Node {
                bias: o.bias,
                ..n.clone()
            },
            _ => n.clone(),
        })
        .collect();

    let mut present: HashSet<usize> = child_nodes.iter().map(|n| n.id).collect();
    for c in &child_connections {
        for id in [c.from, c.to] {
            if present.insert(id) {
                if let Some(&n) = other_nodes.get(&id) {
                    child_nodes.push(n.clone());
                }
            }
        }
    }

    let mut child = Genome {
        key: child_key,
        nodes: child_nodes,
        connections: child_connections,
        fitness: None,
        node_idx_map: HashMap::new(),
        eval_order: Vec::new(),
        incoming_flat: Vec::new(),
        incoming_offsets: Vec::new(),
    };
    topology::disable_cycles(&mut child.connections);
    topology::initialize_node_idx_map(&mut child);
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GenomeLogic, NeatConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_child_inherits_fitter_structure() {
        let config = NeatConfig {
            node_add_prob: 1.0,
            ..Default::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(77);
        let mut fitter = Genome::new_random_with_rng(1, &config, &mut rng);
        let other = Genome::new_random_with_rng(2, &config, &mut rng);
        fitter.mutate(&config, &mut rng);

        let child = genome_crossover_with_rng(&fitter, &other, 3, &mut rng);

        let fitter_innovations: HashSet<usize> =
            fitter.connections.iter().map(|c| c.innovation).collect();
        let child_innovations: HashSet<usize> =
            child.connections.iter().map(|c| c.innovation).collect();
        assert_eq!(fitter_innovations, child_innovations);
        assert_eq!(child.fitness, None);
        assert_eq!(child.hidden_count(), fitter.hidden_count());
    }

    #[test]
    fn test_matching_weights_come_from_a_parent() {
        let config = NeatConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        let p1 = Genome::new_random_with_rng(1, &config, &mut rng);
        let p2 = Genome::new_random_with_rng(2, &config, &mut rng);

        let child = genome_crossover_with_rng(&p1, &p2, 3, &mut rng);
        for gene in &child.connections {
            let w1 = p1
                .connections
                .iter()
                .find(|c| c.innovation == gene.innovation)
                .map(|c| c.weight);
            let w2 = p2
                .connections
                .iter()
                .find(|c| c.innovation == gene.innovation)
                .map(|c| c.weight);
            assert!(Some(gene.weight) == w1 || Some(gene.weight) == w2);
        }
    }

    #[test]
    fn test_self_crossover_is_identity_on_outputs() {
        let config = NeatConfig::default();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let parent = Genome::new_random_with_rng(1, &config, &mut rng);
        let child = genome_crossover_with_rng(&parent, &parent, 2, &mut rng);

        let inputs = [10.0, 0.5, -3.0];
        assert_eq!(parent.forward(&inputs), child.forward(&inputs));
    }
}
