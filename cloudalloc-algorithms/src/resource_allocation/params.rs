use super::initial::{HungarianSolver, InitialStrategy, Objective, RandomInitializer};
use anyhow::{anyhow, Result};
use cloudalloc_challenges::resource_allocation::Challenge;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Hungarian,
    Random,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Params {
    /// Random trials after the SPLR and GELR passes
    pub refinement_iterations: usize,

    /// Seed for the random passes, derived from the challenge seed when unset
    pub seed: Option<u64>,

    pub initial_strategy: StrategyKind,

    /// Objective of the exact initial matching
    pub objective: Objective,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            refinement_iterations: 100,
            seed: None,
            initial_strategy: StrategyKind::default(),
            objective: Objective::default(),
        }
    }
}

impl Params {
    pub fn initialize(h: &Option<Map<String, Value>>) -> Result<Self> {
        let mut p = Self::default();
        if let Some(m) = h {
            if let Some(v) = m.get("refinement_iterations") {
                p.refinement_iterations = v
                    .as_u64()
                    .ok_or_else(|| anyhow!("refinement_iterations must be a non-negative integer"))?
                    as usize;
            }
            if let Some(v) = m.get("seed").filter(|v| !v.is_null()) {
                p.seed = Some(
                    v.as_u64()
                        .ok_or_else(|| anyhow!("seed must be a non-negative integer"))?,
                );
            }
            if let Some(v) = m.get("initial_strategy") {
                p.initial_strategy = serde_json::from_value(v.clone())
                    .map_err(|e| anyhow!("Invalid initial_strategy: {}", e))?;
            }
            if let Some(v) = m.get("objective") {
                p.objective = serde_json::from_value(v.clone())
                    .map_err(|e| anyhow!("Invalid objective: {}", e))?;
            }
        }
        Ok(p)
    }

    pub fn seed_for(&self, challenge: &Challenge) -> u64 {
        self.seed.unwrap_or_else(|| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&challenge.seed[..8]);
            u64::from_le_bytes(bytes)
        })
    }

    pub fn strategy_for(&self, challenge: &Challenge) -> Box<dyn InitialStrategy> {
        match self.initial_strategy {
            StrategyKind::Hungarian => Box::new(HungarianSolver {
                objective: self.objective,
            }),
            StrategyKind::Random => Box::new(RandomInitializer {
                seed: self.seed_for(challenge),
            }),
        }
    }
}
