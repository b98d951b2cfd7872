use crate::config::NeatConfig;
use crate::reporter::{GenerationStatistics, StatisticsReporter};
use crate::species::SpeciesSet;
use crate::GenomeLogic;
use flapper_data::{Genome, GenomeKey};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Lowest breeding weight a surviving species can get.
const MIN_SPECIES_WEIGHT: f64 = 0.05;

/// A cohort of genomes plus everything needed to breed the next one.
///
/// The caller evaluates [`Population::genomes_mut`], writes a fitness onto
/// every genome, then calls [`Population::advance`].
#[derive(Debug)]
pub struct Population {
    pub config: NeatConfig,
    genomes: Vec<Genome>,
    pub species: SpeciesSet,
    pub generation: u64,
    /// Fittest genome seen across all generations.
    pub best: Option<Genome>,
    /// Generation in which `best` earned its fitness.
    pub best_generation: Option<u64>,
    pub reporter: StatisticsReporter,
    rng: ChaCha8Rng,
    next_key: GenomeKey,
}

impl Population {
    pub fn new(config: NeatConfig, seed: Option<u64>) -> anyhow::Result<Self> {
        config.validate()?;
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut population = Self {
            config,
            genomes: Vec::new(),
            species: SpeciesSet::new(),
            generation: 0,
            best: None,
            best_generation: None,
            reporter: StatisticsReporter::new(),
            rng,
            next_key: 0,
        };
        population.genomes = population.random_genomes(population.config.population_size);
        population
            .species
            .speciate(&population.genomes, 0, &population.config);
        Ok(population)
    }

    #[must_use]
    pub fn genomes(&self) -> &[Genome] {
        &self.genomes
    }

    pub fn genomes_mut(&mut self) -> &mut [Genome] {
        &mut self.genomes
    }

    /// Returns false if no genome with `key` is in the current cohort.
    pub fn set_fitness(&mut self, key: GenomeKey, fitness: f64) -> bool {
        match self.genomes.iter_mut().find(|g| g.key == key) {
            Some(genome) => {
                genome.fitness = Some(fitness);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn fitness_reached(&self) -> bool {
        match (self.config.fitness_threshold, &self.best) {
            (Some(threshold), Some(best)) => best.fitness.is_some_and(|f| f >= threshold),
            _ => false,
        }
    }

    /// Records statistics for the evaluated cohort and breeds the next one.
    ///
    /// Returns `Ok(true)` without breeding when the configured fitness
    /// threshold has been reached. Every genome must carry a fitness.
    pub fn advance(&mut self) -> anyhow::Result<bool> {
        if let Some(genome) = self.genomes.iter().find(|g| g.fitness.is_none()) {
            anyhow::bail!("Genome {} has no fitness", genome.key);
        }
        for genome in &self.genomes {
            if let Some(f) = genome.fitness {
                anyhow::ensure!(f.is_finite(), "Genome {} has non-finite fitness", genome.key);
            }
        }

        let stats =
            GenerationStatistics::compute(self.generation, &self.genomes, self.species.len());
        self.reporter.record(stats);
        self.update_best();

        if self.fitness_reached() {
            tracing::info!(
                generation = self.generation,
                "Fitness threshold reached, stopping evolution"
            );
            return Ok(true);
        }

        self.reproduce();
        self.generation += 1;
        self.species
            .speciate(&self.genomes, self.generation, &self.config);
        Ok(false)
    }

    /// Runs up to `generations` cycles and returns the best genome seen.
    pub fn run<F>(&mut self, mut evaluate: F, generations: u64) -> anyhow::Result<Option<Genome>>
    where
        F: FnMut(&mut [Genome]),
    {
        for _ in 0..generations {
            evaluate(&mut self.genomes);
            if self.advance()? {
                break;
            }
        }
        Ok(self.best.clone())
    }

    fn update_best(&mut self) {
        let current = self
            .genomes
            .iter()
            .filter(|g| g.fitness.is_some())
            .max_by(|a, b| a.fitness.unwrap_or(0.0).total_cmp(&b.fitness.unwrap_or(0.0)));
        if let Some(candidate) = current {
            let better = match &self.best {
                Some(best) => candidate.fitness > best.fitness,
                None => true,
            };
            if better {
                self.best = Some(candidate.clone());
                self.best_generation = Some(self.generation);
            }
        }
    }

    fn random_genomes(&mut self, count: usize) -> Vec<Genome> {
        (0..count)
            .map(|_| {
                let key = self.take_key();
                Genome::new_random_with_rng(key, &self.config, &mut self.rng)
            })
            .collect()
    }

    fn take_key(&mut self) -> GenomeKey {
        let key = self.next_key;
        self.next_key += 1;
        key
    }

    fn reproduce(&mut self) {
        let generation = self.generation;
        let fitness_of = |genomes: &[Genome], key: GenomeKey| {
            genomes
                .iter()
                .find(|g| g.key == key)
                .and_then(|g| g.fitness)
                .unwrap_or(0.0)
        };

        // Species fitness is the mean member fitness.
        let mut ranked: Vec<(u64, f64)> = Vec::new();
        for (sid, species) in &mut self.species.species {
            let fitnesses: Vec<f64> = species
                .members
                .iter()
                .map(|&k| fitness_of(&self.genomes, k))
                .collect();
            let mean = fitnesses.iter().sum::<f64>() / fitnesses.len().max(1) as f64;
            let best = fitnesses.iter().copied().fold(f64::MIN, f64::max);
            species.fitness_history.push(mean);
            if species.best_fitness.map_or(true, |b| best > b) {
                species.best_fitness = Some(best);
                species.last_improved = generation;
            }
            ranked.push((*sid, mean));
        }
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let protected: Vec<u64> = ranked
            .iter()
            .take(self.config.species_elitism)
            .map(|(sid, _)| *sid)
            .collect();
        let max_stagnation = self.config.max_stagnation;
        self.species.species.retain(|sid, species| {
            let keep =
                protected.contains(sid) || species.stagnation(generation) < max_stagnation;
            if !keep {
                tracing::debug!(species = sid, "Species removed after stagnating");
            }
            keep
        });
        ranked.retain(|(sid, _)| self.species.species.contains_key(sid));

        if ranked.is_empty() {
            tracing::warn!(generation, "All species went extinct, reseeding population");
            self.genomes = self.random_genomes(self.config.population_size);
            return;
        }

        let min = ranked.iter().map(|(_, f)| *f).fold(f64::MAX, f64::min);
        let max = ranked.iter().map(|(_, f)| *f).fold(f64::MIN, f64::max);
        let range = (max - min).max(1.0);
        let weights: Vec<f64> = ranked
            .iter()
            .map(|(sid, mean)| {
                let adjusted = (mean - min) / range;
                if let Some(species) = self.species.species.get_mut(sid) {
                    species.adjusted_fitness = Some(adjusted);
                }
                adjusted.max(MIN_SPECIES_WEIGHT)
            })
            .collect();
        let spawn = allocate_spawn(&weights, self.config.population_size);

        let mut next = Vec::with_capacity(self.config.population_size);
        for ((sid, _), count) in ranked.iter().zip(spawn) {
            if count == 0 {
                continue;
            }
            let Some(species) = self.species.species.get(sid) else {
                continue;
            };
            let mut members: Vec<Genome> = species
                .members
                .iter()
                .filter_map(|k| self.genomes.iter().find(|g| g.key == *k).cloned())
                .collect();
            if members.is_empty() {
                continue;
            }
            members.sort_by(|a, b| {
                b.fitness
                    .unwrap_or(0.0)
                    .total_cmp(&a.fitness.unwrap_or(0.0))
            });

            let elites = self.config.elitism.min(count).min(members.len());
            for elite in members.iter().take(elites) {
                let mut copy = elite.clone();
                copy.fitness = None;
                next.push(copy);
            }

            let cutoff = ((self.config.survival_threshold as f64 * members.len() as f64).ceil()
                as usize)
                .clamp(2, members.len().max(2))
                .min(members.len());
            let parents = &members[..cutoff.max(1)];

            for _ in elites..count {
                let key = self.take_key();
                let (Some(a), Some(b)) = (
                    parents.choose(&mut self.rng),
                    parents.choose(&mut self.rng),
                ) else {
                    continue;
                };
                let (fitter, other) = if a.fitness.unwrap_or(0.0) >= b.fitness.unwrap_or(0.0) {
                    (a, b)
                } else {
                    (b, a)
                };
                let mut child = fitter.crossover_with_rng(other, key, &mut self.rng);
                child.mutate(&self.config, &mut self.rng);
                next.push(child);
            }
        }

        // Species that lost every member cannot breed; top up from fresh genomes.
        if next.len() < self.config.population_size {
            let missing = self.config.population_size - next.len();
            let mut fresh = self.random_genomes(missing);
            next.append(&mut fresh);
        }
        self.genomes = next;
    }

    #[cfg(test)]
    fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

/// Splits `total` offspring across species proportionally to `weights`,
/// using floor plus largest remainder so the counts sum to exactly `total`.
pub fn allocate_spawn(weights: &[f64], total: usize) -> Vec<usize> {
    if weights.is_empty() {
        return Vec::new();
    }
    let sum: f64 = weights.iter().sum();
    let shares: Vec<f64> = if sum > 0.0 {
        weights.iter().map(|w| w / sum * total as f64).collect()
    } else {
        vec![total as f64 / weights.len() as f64; weights.len()]
    };

    let mut counts: Vec<usize> = shares.iter().map(|s| s.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = shares[a] - shares[a].floor();
        let rb = shares[b] - shares[b].floor();
        rb.total_cmp(&ra).then(a.cmp(&b))
    });
    for &idx in order.iter().cycle().take(total.saturating_sub(assigned)) {
        counts[idx] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::Rng;

    fn small_config() -> NeatConfig {
        NeatConfig {
            population_size: 20,
            ..Default::default()
        }
    }

    fn score_by_output(population: &mut Population) {
        for genome in population.genomes_mut() {
            let out = genome.forward(&[1.0, 0.5, -0.5]);
            genome.fitness = Some(f64::from(out[0]) + 1.0);
        }
    }

    #[test]
    fn test_new_population_has_configured_size() {
        let population = Population::new(small_config(), Some(1)).expect("valid config");
        assert_eq!(population.genomes().len(), 20);
        assert_eq!(population.generation, 0);
        assert!(!population.species.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = NeatConfig {
            population_size: 0,
            ..Default::default()
        };
        assert!(Population::new(config, Some(1)).is_err());
    }

    #[test]
    fn test_advance_requires_fitness() {
        let mut population = Population::new(small_config(), Some(2)).expect("valid config");
        assert!(population.advance().is_err());
        assert_eq!(population.generation, 0);
    }

    #[test]
    fn test_advance_keeps_size_and_increments_generation() {
        let mut population = Population::new(small_config(), Some(3)).expect("valid config");
        for expected in 1..=5 {
            score_by_output(&mut population);
            assert!(!population.advance().expect("advance"));
            assert_eq!(population.generation, expected);
            assert_eq!(population.genomes().len(), 20);
            assert!(population.genomes().iter().all(|g| g.fitness.is_none()));
        }
        assert_eq!(population.reporter.history().len(), 5);
    }

    #[test]
    fn test_keys_are_unique_after_breeding() {
        let mut population = Population::new(small_config(), Some(4)).expect("valid config");
        for _ in 0..3 {
            score_by_output(&mut population);
            population.advance().expect("advance");
        }
        let mut keys: Vec<GenomeKey> = population.genomes().iter().map(|g| g.key).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 20);
    }

    #[test]
    fn test_best_is_monotonic() {
        let mut population = Population::new(small_config(), Some(5)).expect("valid config");
        let mut last = f64::MIN;
        for _ in 0..5 {
            let values: Vec<f64> = (0..20).map(|_| population.rng_mut().gen::<f64>()).collect();
            for (genome, v) in population.genomes_mut().iter_mut().zip(values) {
                genome.fitness = Some(v);
            }
            population.advance().expect("advance");
            let best = population
                .best
                .as_ref()
                .and_then(|g| g.fitness)
                .expect("best recorded");
            assert!(best >= last);
            last = best;
        }
    }

    #[test]
    fn test_best_generation_survives_weaker_rerun_of_same_genome() {
        let mut population = Population::new(small_config(), Some(12)).expect("valid config");
        for (i, genome) in population.genomes_mut().iter_mut().enumerate() {
            genome.fitness = Some(if i == 3 { 10.0 } else { 1.0 });
        }
        population.advance().expect("advance");
        let champion_key = population.best.as_ref().map(|g| g.key);
        assert_eq!(population.best_generation, Some(0));

        // The champion may carry over as an elite; it now tops a weaker cohort.
        for genome in population.genomes_mut() {
            let carried = Some(genome.key) == champion_key;
            genome.fitness = Some(if carried { 5.0 } else { 1.0 });
        }
        population.advance().expect("advance");
        assert_eq!(population.best_generation, Some(0));
        assert_eq!(population.best.as_ref().and_then(|g| g.fitness), Some(10.0));

        for (i, genome) in population.genomes_mut().iter_mut().enumerate() {
            genome.fitness = Some(if i == 0 { 20.0 } else { 1.0 });
        }
        population.advance().expect("advance");
        assert_eq!(population.best_generation, Some(2));
    }

    #[test]
    fn test_fitness_threshold_stops_evolution() {
        let config = NeatConfig {
            fitness_threshold: Some(0.5),
            ..small_config()
        };
        let mut population = Population::new(config, Some(6)).expect("valid config");
        for genome in population.genomes_mut() {
            genome.fitness = Some(1.0);
        }
        assert!(population.advance().expect("advance"));
        assert_eq!(population.generation, 0);
    }

    #[test]
    fn test_seeded_populations_are_reproducible() {
        let mut a = Population::new(small_config(), Some(9)).expect("valid config");
        let mut b = Population::new(small_config(), Some(9)).expect("valid config");
        for _ in 0..3 {
            score_by_output(&mut a);
            score_by_output(&mut b);
            a.advance().expect("advance");
            b.advance().expect("advance");
        }
        assert_eq!(a.genomes(), b.genomes());
    }

    #[test]
    fn test_run_returns_best() {
        let mut population = Population::new(small_config(), Some(10)).expect("valid config");
        let best = population
            .run(
                |genomes| {
                    for genome in genomes {
                        genome.fitness = Some(genome.enabled_connections() as f64);
                    }
                },
                3,
            )
            .expect("run");
        assert!(best.is_some());
        assert_eq!(population.generation, 3);
    }

    #[test]
    fn test_allocate_spawn_sums_to_total() {
        assert_eq!(allocate_spawn(&[1.0, 1.0, 1.0], 10).iter().sum::<usize>(), 10);
        assert_eq!(allocate_spawn(&[0.05, 0.9], 7), vec![0, 7]);
        assert_eq!(allocate_spawn(&[0.0, 0.0], 5).iter().sum::<usize>(), 5);
        assert!(allocate_spawn(&[], 5).is_empty());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_allocate_spawn_always_sums_to_total(
            weights in prop::collection::vec(0.0f64..10.0, 1..8),
            total in 0usize..200
        ) {
            let counts = allocate_spawn(&weights, total);
            prop_assert_eq!(counts.len(), weights.len());
            prop_assert_eq!(counts.iter().sum::<usize>(), total);
        }

        #[test]
        fn test_advance_keeps_population_size(
            seed in any::<u64>(),
            fitness in prop::collection::vec(0.0f64..100.0, 20)
        ) {
            let mut population = Population::new(small_config(), Some(seed)).expect("valid config");
            for (genome, f) in population.genomes_mut().iter_mut().zip(&fitness) {
                genome.fitness = Some(*f);
            }
            prop_assert!(!population.advance().expect("advance"));
            prop_assert_eq!(population.genomes().len(), 20);

            let mut keys: Vec<GenomeKey> = population.genomes().iter().map(|g| g.key).collect();
            keys.sort_unstable();
            keys.dedup();
            prop_assert_eq!(keys.len(), 20);
        }
    }
}
