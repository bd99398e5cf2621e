// src/runtime/dice.rs
//! Direction rolls for the random walk
//!
//! A roll has five equally likely faces: four directions and `Stay`. The
//! 20% chance of standing still is part of the walk's statistics and must
//! not be dropped.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Roll {
    East,
    South,
    West,
    North,
    Stay,
}

impl Roll {
    pub const FACES: usize = 5;

    pub fn from_face(face: usize) -> Self {
        match face % Self::FACES {
            0 => Roll::East,
            1 => Roll::South,
            2 => Roll::West,
            3 => Roll::North,
            _ => Roll::Stay,
        }
    }

    /// (column, row) delta, or `None` for `Stay`
    pub fn offset(self) -> Option<(i32, i32)> {
        match self {
            Roll::East => Some((1, 0)),
            Roll::South => Some((0, 1)),
            Roll::West => Some((-1, 0)),
            Roll::North => Some((0, -1)),
            Roll::Stay => None,
        }
    }
}

/// Source of rolls
pub trait Dice {
    fn roll(&mut self) -> Roll;
}

/// Uniform rolls from a seedable RNG
pub struct RandomDice {
    rng: StdRng,
}

impl RandomDice {
    /// Seeded for reproducible walks, or from OS entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl Dice for RandomDice {
    fn roll(&mut self) -> Roll {
        Roll::from_face(self.rng.gen_range(0..Roll::FACES))
    }
}

/// Replays a fixed sequence, then stays put forever
#[derive(Debug, Clone, Default)]
pub struct ScriptedDice {
    rolls: VecDeque<Roll>,
}

impl ScriptedDice {
    pub fn new<I: IntoIterator<Item = Roll>>(rolls: I) -> Self {
        Self {
            rolls: rolls.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.rolls.len()
    }
}

impl Dice for ScriptedDice {
    fn roll(&mut self) -> Roll {
        self.rolls.pop_front().unwrap_or(Roll::Stay)
    }
}
