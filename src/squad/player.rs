//! Players, positions and ratings

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::FootballError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    GK,
    DF,
    MF,
    FW,
}

impl Position {
    pub fn is_goalkeeper(&self) -> bool {
        matches!(self, Position::GK)
    }
}

impl FromStr for Position {
    type Err = FootballError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "GK" | "GOALKEEPER" => Ok(Position::GK),
            "DF" | "DEF" | "DEFENDER" => Ok(Position::DF),
            "MF" | "MID" | "MIDFIELDER" => Ok(Position::MF),
            "FW" | "FWD" | "FORWARD" | "ST" => Ok(Position::FW),
            other => Err(FootballError::Parse(format!("Unknown position: {}", other))),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Position::GK => "GK",
            Position::DF => "DF",
            Position::MF => "MF",
            Position::FW => "FW",
        };
        write!(f, "{}", s)
    }
}

/// Attribute ratings on a 0-100 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Attributes {
    pub attacking: u8,
    pub passing: u8,
    pub defending: u8,
    pub goalkeeping: u8,
    pub pace: u8,
    pub stamina: u8,
}

impl Attributes {
    /// Same value for every attribute
    pub fn uniform(value: u8) -> Self {
        Attributes {
            attacking: value,
            passing: value,
            defending: value,
            goalkeeping: value,
            pace: value,
            stamina: value,
        }
    }

    fn weighted(&self, weights: [f32; 6]) -> f32 {
        let values = [
            self.attacking,
            self.passing,
            self.defending,
            self.goalkeeping,
            self.pace,
            self.stamina,
        ];
        values
            .iter()
            .zip(weights.iter())
            .map(|(v, w)| *v as f32 * w)
            .sum()
    }
}

fn full_fitness() -> u8 {
    100
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub age: u8,
    pub attributes: Attributes,
    /// Recent form from -2 (poor) to +2 (excellent)
    #[serde(default)]
    pub form: i8,
    #[serde(default = "full_fitness")]
    pub fitness: u8,
    #[serde(default)]
    pub injured: bool,
    #[serde(default)]
    pub suspended: bool,
}

impl Player {
    pub fn new(id: u32, name: &str, position: Position, age: u8, attributes: Attributes) -> Self {
        Player {
            id,
            name: name.to_string(),
            position,
            age,
            attributes,
            form: 0,
            fitness: 100,
            injured: false,
            suspended: false,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.injured && !self.suspended
    }

    /// Position-weighted attribute rating
    pub fn overall(&self) -> f32 {
        // attacking, passing, defending, goalkeeping, pace, stamina
        let weights = match self.position {
            Position::GK => [0.0, 0.1, 0.1, 0.7, 0.05, 0.05],
            Position::DF => [0.05, 0.15, 0.5, 0.0, 0.15, 0.15],
            Position::MF => [0.2, 0.4, 0.15, 0.0, 0.1, 0.15],
            Position::FW => [0.55, 0.15, 0.0, 0.0, 0.2, 0.1],
        };
        self.attributes.weighted(weights)
    }

    /// Rating adjusted for form, fitness and age; 0 when unavailable
    pub fn effective_rating(&self) -> f32 {
        if !self.is_available() {
            return 0.0;
        }
        let mut rating = self.overall() + 2.0 * self.form.clamp(-2, 2) as f32;

        let fitness = self.fitness.min(100) as f32;
        if fitness < 80.0 {
            rating *= 1.0 - 0.2 * (80.0 - fitness) / 80.0;
        }

        if self.age < 24 {
            rating -= (24 - self.age) as f32;
        } else if self.age > 30 {
            rating -= (self.age - 30) as f32;
        }

        rating.clamp(0.0, 100.0)
    }

    /// Effective rating as a share of the unadjusted rating
    pub fn condition(&self) -> f32 {
        let overall = self.overall();
        if overall <= 0.0 {
            0.0
        } else {
            self.effective_rating() / overall
        }
    }
}
