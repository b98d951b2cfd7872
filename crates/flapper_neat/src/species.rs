use crate::config::NeatConfig;
use flapper_data::{Genome, GenomeKey};
use std::collections::{BTreeMap, HashMap};

/// Genetic distance between two genomes.
///
/// Disjoint and excess genes are counted together. Both node and connection
/// genes contribute, each normalised by the larger genome.
pub fn compatibility_distance(a: &Genome, b: &Genome, config: &NeatConfig) -> f32 {
    let c_disjoint = config.compatibility_disjoint_coefficient;
    let c_weight = config.compatibility_weight_coefficient;

    let nodes_b: HashMap<usize, f32> = b.nodes.iter().map(|n| (n.id, n.bias)).collect();
    let mut node_diff = 0.0;
    let mut node_matching = 0usize;
    for n in &a.nodes {
        if let Some(bias) = nodes_b.get(&n.id) {
            node_diff += (n.bias - bias).abs();
            node_matching += 1;
        }
    }
    let node_disjoint = (a.nodes.len() + b.nodes.len()).saturating_sub(2 * node_matching);
    let node_max = a.nodes.len().max(b.nodes.len()).max(1) as f32;
    let node_distance = (c_weight * node_diff + c_disjoint * node_disjoint as f32) / node_max;

    let conns_b: HashMap<usize, (f32, bool)> = b
        .connections
        .iter()
        .map(|c| (c.innovation, (c.weight, c.enabled)))
        .collect();
    let mut conn_diff = 0.0;
    let mut conn_matching = 0usize;
    for c in &a.connections {
        if let Some(&(weight, enabled)) = conns_b.get(&c.innovation) {
            conn_diff += (c.weight - weight).abs();
            if c.enabled != enabled {
                conn_diff += 1.0;
            }
            conn_matching += 1;
        }
    }
    let conn_disjoint =
        (a.connections.len() + b.connections.len()).saturating_sub(2 * conn_matching);
    let conn_max = a.connections.len().max(b.connections.len()).max(1) as f32;
    let conn_distance = (c_weight * conn_diff + c_disjoint * conn_disjoint as f32) / conn_max;

    node_distance + conn_distance
}

#[derive(Debug, Clone)]
pub struct Species {
    pub id: u64,
    /// Generation the species first appeared in.
    pub created: u64,
    pub last_improved: u64,
    pub representative: Genome,
    pub members: Vec<GenomeKey>,
    /// Best member fitness ever seen.
    pub best_fitness: Option<f64>,
    pub fitness_history: Vec<f64>,
    /// Mean member fitness shared across the species, set during reproduction.
    pub adjusted_fitness: Option<f64>,
}

impl Species {
    fn new(id: u64, generation: u64, representative: Genome) -> Self {
        Self {
            id,
            created: generation,
            last_improved: generation,
            members: vec![representative.key],
            representative,
            best_fitness: None,
            fitness_history: Vec::new(),
            adjusted_fitness: None,
        }
    }

    #[must_use]
    pub fn stagnation(&self, generation: u64) -> u64 {
        generation.saturating_sub(self.last_improved)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpeciesSet {
    pub species: BTreeMap<u64, Species>,
    next_id: u64,
    membership: HashMap<GenomeKey, u64>,
}

impl SpeciesSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Partitions `genomes` into species.
    ///
    /// Each surviving species first claims the genome closest to its old
    /// representative. Remaining genomes join the closest species within the
    /// compatibility threshold or found a new one. Species left empty are dropped.
    pub fn speciate(&mut self, genomes: &[Genome], generation: u64, config: &NeatConfig) {
        let threshold = config.compatibility_threshold;
        let mut unspeciated: Vec<usize> = (0..genomes.len()).collect();
        let mut new_members: BTreeMap<u64, Vec<GenomeKey>> = BTreeMap::new();
        let mut new_representatives: BTreeMap<u64, usize> = BTreeMap::new();

        for (&sid, species) in &self.species {
            let closest = unspeciated
                .iter()
                .enumerate()
                .map(|(pos, &gi)| {
                    (
                        pos,
                        compatibility_distance(&species.representative, &genomes[gi], config),
                    )
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((pos, _)) = closest {
                let gi = unspeciated.remove(pos);
                new_representatives.insert(sid, gi);
                new_members.insert(sid, vec![genomes[gi].key]);
            }
        }

        for gi in unspeciated {
            let genome = &genomes[gi];
            let closest = new_representatives
                .iter()
                .map(|(&sid, &ri)| (sid, compatibility_distance(&genomes[ri], genome, config)))
                .filter(|(_, d)| *d < threshold)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            match closest {
                Some((sid, _)) => new_members.entry(sid).or_default().push(genome.key),
                None => {
                    let sid = self.next_id;
                    self.next_id += 1;
                    new_representatives.insert(sid, gi);
                    new_members.insert(sid, vec![genome.key]);
                }
            }
        }

        self.species.retain(|sid, _| new_representatives.contains_key(sid));
        self.membership.clear();
        for (sid, gi) in new_representatives {
            let members = new_members.remove(&sid).unwrap_or_default();
            for &key in &members {
                self.membership.insert(key, sid);
            }
            let representative = genomes[gi].clone();
            match self.species.get_mut(&sid) {
                Some(species) => {
                    species.representative = representative;
                    species.members = members;
                }
                None => {
                    let mut species = Species::new(sid, generation, representative);
                    species.members = members;
                    self.species.insert(sid, species);
                }
            }
        }
    }

    #[must_use]
    pub fn species_of(&self, key: GenomeKey) -> Option<u64> {
        self.membership.get(&key).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.species.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}
