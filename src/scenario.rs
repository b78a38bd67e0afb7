//! Random sandbox scenarios

use crate::error::{Error, Result};
use crate::model::{Process, Resource, ResourceId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

const MIN_ENTITIES: usize = 2;
const MAX_ENTITIES: usize = 6;

const RESOURCE_NAMES: [&str; 6] = ["CPU", "Memory", "Disk", "Printer", "Network", "Power"];
const RESOURCE_ICONS: [&str; 6] = ["🖥️", "📊", "💾", "🖨️", "🌐", "🔋"];
const PROCESS_ICONS: [&str; 6] = ["📊", "🔍", "📱", "🎬", "🎮", "📝"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub processes: Vec<Process>,
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Copy)]
pub struct ScenarioGenerator {
    processes: usize,
    resources: usize,
}

impl ScenarioGenerator {
    /// Both counts must lie in 2..=6.
    pub fn new(processes: usize, resources: usize) -> Result<Self> {
        let range = MIN_ENTITIES..=MAX_ENTITIES;
        if !range.contains(&processes) {
            return Err(Error::InvalidScenario(format!(
                "process count must be between {} and {}, got {}",
                MIN_ENTITIES, MAX_ENTITIES, processes
            )));
        }
        if !range.contains(&resources) {
            return Err(Error::InvalidScenario(format!(
                "resource count must be between {} and {}, got {}",
                MIN_ENTITIES, MAX_ENTITIES, resources
            )));
        }
        Ok(Self {
            processes,
            resources,
        })
    }

    /// Each process needs between one and all resources, chosen without repeats.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Scenario {
        let resources: Vec<Resource> = (0..self.resources)
            .map(|i| {
                Resource::new(
                    format!("r{}", i + 1),
                    RESOURCE_NAMES[i].to_string(),
                    RESOURCE_ICONS[i].to_string(),
                )
            })
            .collect();
        let ids: Vec<ResourceId> = resources.iter().map(|r| r.id.clone()).collect();

        let processes = (0..self.processes)
            .map(|i| {
                let count = rng.gen_range(1..=ids.len());
                let needs: Vec<ResourceId> = ids.choose_multiple(rng, count).cloned().collect();
                Process::new(
                    format!("p{}", i + 1),
                    format!("Process {}", i + 1),
                    PROCESS_ICONS[i].to_string(),
                    needs,
                )
            })
            .collect();

        Scenario {
            processes,
            resources,
        }
    }

    pub fn generate_seeded(&self, seed: u64) -> Scenario {
        self.generate(&mut StdRng::seed_from_u64(seed))
    }
}
