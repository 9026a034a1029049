//! Benchmark scenarios: a procedural structure, a load and solver settings.
//!
//! Three canonical scenarios:
//! 1. **Wall** - a wide wall standing on the ground under gravity
//! 2. **Hanging chain** - a long chain hanging from the world, weak links
//! 3. **Tower** - a solid block, spun around its vertical axis

use glam::Vec3;
use serde::{Deserialize, Serialize};

use rubble_solver::StressSolverSettings;
use rubble_stress::generators::{chain, tower, wall, Structure};
use rubble_types::RubbleResult;

/// Which benchmark scenario to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    Wall,
    HangingChain,
    Tower,
}

impl ScenarioKind {
    /// Returns all scenario kinds.
    pub fn all() -> &'static [ScenarioKind] {
        &[ScenarioKind::Wall, ScenarioKind::HangingChain, ScenarioKind::Tower]
    }

    /// Returns a human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioKind::Wall => "wall",
            ScenarioKind::HangingChain => "hanging_chain",
            ScenarioKind::Tower => "tower",
        }
    }

    /// Parses a name produced by [`Self::name`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|kind| kind.name() == name)
    }
}

/// A fully specified benchmark scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub structure: Structure,
    pub settings: StressSolverSettings,
    /// Frames to simulate.
    pub frames: u32,
    /// Chunk density (kg/m³).
    pub density: f32,
    /// Gravity applied every frame (m/s²).
    pub gravity: Vec3,
    /// Spin applied every frame around the structure's centroid.
    pub angular_velocity: Vec3,
}

impl Scenario {
    /// A 12×8 wall of 0.5 m bricks standing on the ground.
    pub fn wall() -> Self {
        Self {
            kind: ScenarioKind::Wall,
            structure: wall(12, 8, 0.5, 50.0),
            settings: StressSolverSettings::default(),
            frames: 60,
            density: 1_000.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            angular_velocity: Vec3::ZERO,
        }
    }

    /// A 24-link chain hanging from the world, weak enough to tear.
    pub fn hanging_chain() -> Self {
        Self {
            kind: ScenarioKind::HangingChain,
            structure: chain(24, 0.25, 0.5),
            settings: StressSolverSettings {
                graph_reduction_level: 1,
                ..Default::default()
            },
            frames: 60,
            density: 2_000.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            angular_velocity: Vec3::ZERO,
        }
    }

    /// A 4×10×4 block spinning about Y.
    pub fn tower() -> Self {
        Self {
            kind: ScenarioKind::Tower,
            structure: tower(4, 10, 4, 0.5, 200.0),
            settings: StressSolverSettings::default(),
            frames: 60,
            density: 1_000.0,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            angular_velocity: Vec3::new(0.0, 2.0, 0.0),
        }
    }

    /// Create a scenario by kind.
    pub fn from_kind(kind: ScenarioKind) -> Self {
        match kind {
            ScenarioKind::Wall => Self::wall(),
            ScenarioKind::HangingChain => Self::hanging_chain(),
            ScenarioKind::Tower => Self::tower(),
        }
    }

    /// Replaces every bond health.
    pub fn with_bond_health(mut self, health: f32) -> Self {
        self.structure.bond_healths.fill(health);
        self
    }

    /// Chunk-weighted centroid of the structure.
    pub fn center_of_mass(&self) -> Vec3 {
        let mut weighted = Vec3::ZERO;
        let mut volume = 0.0;
        for chunk in &self.structure.chunks {
            weighted += chunk.centroid * chunk.volume;
            volume += chunk.volume;
        }
        if volume > 0.0 {
            weighted / volume
        } else {
            Vec3::ZERO
        }
    }
}

/// Scenario description loaded from TOML.
///
/// ```toml
/// kind = "wall"
/// frames = 120
/// bond_health = 25.0
///
/// [settings]
/// graph_reduction_level = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub kind: ScenarioKind,
    #[serde(default)]
    pub frames: Option<u32>,
    #[serde(default)]
    pub density: Option<f32>,
    #[serde(default)]
    pub gravity: Option<Vec3>,
    #[serde(default)]
    pub angular_velocity: Option<Vec3>,
    /// Overrides every bond's initial health.
    #[serde(default)]
    pub bond_health: Option<f32>,
    #[serde(default)]
    pub settings: StressSolverSettings,
}

impl ScenarioConfig {
    /// Starts from the built-in scenario and applies the overrides.
    pub fn into_scenario(self) -> RubbleResult<Scenario> {
        self.settings.validate()?;
        let mut scenario = Scenario::from_kind(self.kind);
        scenario.settings = self.settings;
        if let Some(frames) = self.frames {
            scenario.frames = frames;
        }
        if let Some(density) = self.density {
            scenario.density = density;
        }
        if let Some(gravity) = self.gravity {
            scenario.gravity = gravity;
        }
        if let Some(angular_velocity) = self.angular_velocity {
            scenario.angular_velocity = angular_velocity;
        }
        if let Some(health) = self.bond_health {
            scenario = scenario.with_bond_health(health);
        }
        Ok(scenario)
    }
}
