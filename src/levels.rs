//! Built-in level catalog
//!
//! Levels are plain data: processes with their needs, free resources, and
//! the rules the session should run under. External loaders can supply
//! their own through [`LevelDefinition::from_json`].

use crate::config::WinCondition;
use crate::error::Result;
use crate::model::{Process, Resource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub objective: String,
    /// Suggested time limit for an external countdown, in seconds.
    pub max_time_secs: u64,
    pub processes: Vec<Process>,
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub win_condition: WinCondition,
    /// Whether allocations trigger deadlock detection.
    #[serde(default = "default_checks_deadlock")]
    pub checks_deadlock: bool,
}

fn default_checks_deadlock() -> bool {
    true
}

impl LevelDefinition {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn process(id: &str, name: &str, icon: &str, needs: &[&str]) -> Process {
    Process::new(id, name, icon, needs.iter().map(|r| (*r).into()))
}

fn resource(id: &str, name: &str, icon: &str) -> Resource {
    Resource::new(id, name, icon)
}

pub fn builtin_levels() -> Vec<LevelDefinition> {
    vec![
        LevelDefinition {
            id: 1,
            title: "Processes and Resources".to_string(),
            description: "Learn to allocate resources to the processes that need them."
                .to_string(),
            objective: "Complete every process without a deadlock".to_string(),
            max_time_secs: 120,
            processes: vec![
                process("P1", "Word Processor", "📝", &["R1", "R2"]),
                process("P2", "Browser", "🌐", &["R2"]),
            ],
            resources: vec![resource("R1", "CPU", "⚙️"), resource("R2", "Memory", "🧠")],
            win_condition: WinCondition::AllProcessesCompleted,
            checks_deadlock: false,
        },
        LevelDefinition {
            id: 2,
            title: "Hidden Deadlock".to_string(),
            description: "A careless allocation order leads to a circular wait.".to_string(),
            objective: "Complete every process and resolve any deadlock".to_string(),
            max_time_secs: 180,
            processes: vec![
                process("P1", "Database", "🗄️", &["R1", "R3"]),
                process("P2", "Web Server", "🖥️", &["R2", "R3"]),
                process("P3", "Backup Service", "💾", &["R1", "R2"]),
            ],
            resources: vec![
                resource("R1", "CPU", "⚙️"),
                resource("R2", "Memory", "🧠"),
                resource("R3", "Disk", "💿"),
            ],
            win_condition: WinCondition::AllProcessesCompletedOrDeadlockResolved,
            checks_deadlock: true,
        },
        LevelDefinition {
            id: 3,
            title: "High Complexity".to_string(),
            description: "Many processes compete for a handful of resources.".to_string(),
            objective: "Manage resources carefully and handle every deadlock".to_string(),
            max_time_secs: 240,
            processes: vec![
                process("P1", "Video Editor", "🎬", &["R1", "R2", "R4"]),
                process("P2", "3D Renderer", "🎮", &["R1", "R3"]),
                process("P3", "AI Training", "🤖", &["R2", "R3", "R4"]),
                process("P4", "Data Analysis", "📊", &["R1", "R4"]),
                process("P5", "Compiler", "⌨️", &["R2", "R3"]),
            ],
            resources: vec![
                resource("R1", "CPU", "⚙️"),
                resource("R2", "Memory", "🧠"),
                resource("R3", "GPU", "📺"),
                resource("R4", "Disk", "💿"),
            ],
            win_condition: WinCondition::AllProcessesCompletedOrDeadlockResolved,
            checks_deadlock: true,
        },
    ]
}

pub fn level(id: u32) -> Option<LevelDefinition> {
    builtin_levels().into_iter().find(|l| l.id == id)
}
