use crate::engines::generation::genome::Genome;
use crate::functions::{GridPrimitive, ParamKind, PrimitiveRegistry};
use crate::types::{Program, ProgramStep, TaskPattern, MAX_COLOR};
use rand::Rng;
use std::sync::Arc;

/// Tournament selection: best of K uniformly drawn candidates.
pub fn tournament_selection<'a, R: Rng>(
    population: &'a [(Genome, f64)],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Genome {
    let mut best_idx = rng.gen_range(0..population.len());
    let mut best_fitness = population[best_idx].1;

    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..population.len());
        if population[idx].1 > best_fitness {
            best_idx = idx;
            best_fitness = population[idx].1;
        }
    }

    &population[best_idx].0
}

/// Single-point crossover for variable-length programs: each child takes
/// a head from one parent and a tail from the other. Parents too short to
/// cut are returned as-is.
pub fn crossover<R: Rng>(
    parent1: &Program,
    parent2: &Program,
    max_len: usize,
    rng: &mut R,
) -> (Program, Program) {
    if parent1.len() <= 1 || parent2.len() <= 1 {
        return (parent1.clone(), parent2.clone());
    }

    let cut1 = rng.gen_range(1..parent1.len());
    let cut2 = rng.gen_range(1..parent2.len());

    let mut child1: Program = parent1[..cut1].to_vec();
    child1.extend_from_slice(&parent2[cut2..]);
    child1.truncate(max_len);

    let mut child2: Program = parent2[..cut2].to_vec();
    child2.extend_from_slice(&parent1[cut1..]);
    child2.truncate(max_len);

    (child1, child2)
}

/// Per-position mutation: each step independently, with probability
/// `mutation_rate`, is replaced, re-parameterized, followed by an
/// insertion, or deleted. Length stays within `1..=max_len`.
pub fn mutate<R: Rng>(
    program: &mut Program,
    mutation_rate: f64,
    pool: &[Arc<dyn GridPrimitive>],
    palette: &[u8],
    max_len: usize,
    rng: &mut R,
) {
    if pool.is_empty() {
        return;
    }
    let mut position = 0;
    while position < program.len() {
        if rng.gen::<f64>() >= mutation_rate {
            position += 1;
            continue;
        }
        match rng.gen_range(0..4u8) {
            0 => {
                program[position] = random_step(pool, palette, rng);
                position += 1;
            }
            1 => {
                let name = program[position].primitive.clone();
                if let Some(primitive) = pool.iter().find(|p| p.name() == name) {
                    program[position].params = random_params(primitive.as_ref(), palette, rng);
                }
                position += 1;
            }
            2 => {
                if program.len() < max_len {
                    program.insert(position + 1, random_step(pool, palette, rng));
                    position += 2;
                } else {
                    position += 1;
                }
            }
            _ => {
                if program.len() > 1 {
                    program.remove(position);
                } else {
                    position += 1;
                }
            }
        }
    }
}

/// A random program of `min_len..=max_len` steps drawn from `pool`.
pub fn random_program<R: Rng>(
    pool: &[Arc<dyn GridPrimitive>],
    palette: &[u8],
    min_len: usize,
    max_len: usize,
    rng: &mut R,
) -> Program {
    let len = rng.gen_range(min_len.max(1)..=max_len.max(1));
    (0..len).map(|_| random_step(pool, palette, rng)).collect()
}

pub fn random_step<R: Rng>(
    pool: &[Arc<dyn GridPrimitive>],
    palette: &[u8],
    rng: &mut R,
) -> ProgramStep {
    let primitive = &pool[rng.gen_range(0..pool.len())];
    ProgramStep::new(
        primitive.name(),
        random_params(primitive.as_ref(), palette, rng),
    )
}

fn random_params<R: Rng>(
    primitive: &dyn GridPrimitive,
    palette: &[u8],
    rng: &mut R,
) -> Vec<i32> {
    primitive
        .params()
        .iter()
        .map(|spec| match spec.kind {
            ParamKind::Color => {
                if palette.is_empty() {
                    rng.gen_range(0..=MAX_COLOR as i32)
                } else {
                    palette[rng.gen_range(0..palette.len())] as i32
                }
            }
            ParamKind::Count => rng.gen_range(1..=3),
            ParamKind::Direction => rng.gen_range(0..crate::functions::Direction::COUNT),
        })
        .collect()
}

/// A random program drawn only from primitives biased toward `pattern`.
/// Falls back to the full searchable pool for patterns without biased
/// primitives.
pub fn specialist_program<R: Rng>(
    pattern: TaskPattern,
    registry: &PrimitiveRegistry,
    palette: &[u8],
    min_len: usize,
    max_len: usize,
    rng: &mut R,
) -> Program {
    let mut pool = registry.biased_toward(pattern);
    if pool.is_empty() {
        pool = registry.searchable();
    }
    random_program(&pool, palette, min_len, max_len, rng)
}

/// Hamming distance between program signatures. Used only for diversity
/// selection, never for fitness.
pub fn signature_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
