//! Formations, squads and team strength

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::player::{Player, Position};
use crate::simulation::TeamProfile;
use crate::FootballError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Formation {
    #[serde(rename = "4-4-2")]
    F442,
    #[serde(rename = "4-3-3")]
    F433,
    #[serde(rename = "3-5-2")]
    F352,
    #[serde(rename = "4-2-3-1")]
    F4231,
    #[serde(rename = "5-3-2")]
    F532,
}

impl Formation {
    pub const ALL: [Formation; 5] = [
        Formation::F442,
        Formation::F433,
        Formation::F352,
        Formation::F4231,
        Formation::F532,
    ];

    /// Returns (defenders, midfielders, forwards)
    pub fn lines(&self) -> (usize, usize, usize) {
        match self {
            Formation::F442 => (4, 4, 2),
            Formation::F433 => (4, 3, 3),
            Formation::F352 => (3, 5, 2),
            Formation::F4231 => (4, 5, 1),
            Formation::F532 => (5, 3, 2),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Formation::F442 => "4-4-2",
            Formation::F433 => "4-3-3",
            Formation::F352 => "3-5-2",
            Formation::F4231 => "4-2-3-1",
            Formation::F532 => "5-3-2",
        }
    }
}

impl Default for Formation {
    fn default() -> Self {
        Formation::F442
    }
}

impl FromStr for Formation {
    type Err = FootballError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formation::ALL
            .into_iter()
            .find(|f| f.code() == s.trim())
            .ok_or_else(|| FootballError::Parse(format!("Unknown formation: {}", s)))
    }
}

impl fmt::Display for Formation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// 0-100 strength ratings derived from a team's best eleven
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TeamStrength {
    pub attack: f32,
    pub midfield: f32,
    pub defence: f32,
    pub goalkeeper: f32,
    pub overall: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SquadTeam {
    pub name: String,
    #[serde(default)]
    pub formation: Formation,
    #[serde(default)]
    pub players: Vec<Player>,
}

fn mean(values: impl Iterator<Item = f32>) -> Option<f32> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f32)
    }
}

impl SquadTeam {
    pub fn new(name: &str, formation: Formation) -> Self {
        SquadTeam {
            name: name.to_string(),
            formation,
            players: Vec::new(),
        }
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Best available eleven for the formation, goalkeeper first.
    ///
    /// Each slot takes the highest effective-rated available player of that
    /// position; unfilled slots fall back to the best remaining outfield
    /// players. Fewer than eleven are returned when the squad runs out.
    pub fn best_xi(&self) -> Vec<&Player> {
        let mut available: Vec<&Player> = self.players.iter().filter(|p| p.is_available()).collect();
        available.sort_by(|a, b| {
            b.effective_rating()
                .total_cmp(&a.effective_rating())
                .then(a.id.cmp(&b.id))
        });

        let (def, mid, fwd) = self.formation.lines();
        let mut picked: Vec<&Player> = Vec::with_capacity(11);
        for (position, count) in [
            (Position::GK, 1),
            (Position::DF, def),
            (Position::MF, mid),
            (Position::FW, fwd),
        ] {
            let chosen: Vec<&Player> = available
                .iter()
                .copied()
                .filter(|p| p.position == position)
                .take(count)
                .collect();
            available.retain(|p| !chosen.iter().any(|c| c.id == p.id));
            picked.extend(chosen);
        }

        let has_keeper = picked.first().is_some_and(|p| p.position.is_goalkeeper());
        let fill: Vec<&Player> = available
            .iter()
            .copied()
            .filter(|p| !p.position.is_goalkeeper())
            .take(11 - picked.len())
            .collect();
        picked.extend(fill);

        if !has_keeper && !picked.is_empty() {
            // No keeper available; best shot-stopper of the eleven goes in goal
            let keeper = picked
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.attributes.goalkeeping.cmp(&b.attributes.goalkeeping))
                .map(|(i, _)| i)
                .unwrap_or(0);
            let gk = picked.remove(keeper);
            picked.insert(0, gk);
        }
        picked
    }

    /// Substitutes: best available players outside the eleven
    pub fn bench(&self, size: usize) -> Vec<&Player> {
        let xi: Vec<u32> = self.best_xi().iter().map(|p| p.id).collect();
        let mut bench: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| p.is_available() && !xi.contains(&p.id))
            .collect();
        bench.sort_by(|a, b| b.effective_rating().total_cmp(&a.effective_rating()));
        bench.truncate(size);
        bench
    }

    /// Scale by how much of the eleven could be fielded
    fn completeness(xi: &[&Player]) -> f32 {
        xi.len().min(11) as f32 / 11.0
    }

    pub fn attack_strength(&self) -> f32 {
        let xi = self.best_xi();
        let weighted = xi.iter().filter_map(|p| {
            let value = (0.7 * p.attributes.attacking as f32 + 0.3 * p.attributes.pace as f32) * p.condition();
            match p.position {
                Position::FW => Some((value, 2.0)),
                Position::MF => Some((value, 1.0)),
                _ => None,
            }
        });
        let (sum, weight) = weighted.fold((0.0, 0.0), |(s, w), (v, wt)| (s + v * wt, w + wt));
        if weight == 0.0 {
            return 0.0;
        }
        sum / weight * Self::completeness(&xi)
    }

    pub fn midfield_strength(&self) -> f32 {
        let xi = self.best_xi();
        let value = |p: &&Player| {
            (0.6 * p.attributes.passing as f32
                + 0.2 * p.attributes.stamina as f32
                + 0.2 * p.attributes.defending as f32)
                * p.condition()
        };
        let mids = mean(xi.iter().filter(|p| p.position == Position::MF).map(value));
        let strength = mids
            .or_else(|| mean(xi.iter().filter(|p| !p.position.is_goalkeeper()).map(value)))
            .unwrap_or(0.0);
        strength * Self::completeness(&xi)
    }

    pub fn defence_strength(&self) -> f32 {
        let xi = self.best_xi();
        let weighted = xi.iter().filter_map(|p| {
            let value = (0.8 * p.attributes.defending as f32 + 0.2 * p.attributes.pace as f32) * p.condition();
            match p.position {
                Position::DF => Some((value, 2.0)),
                Position::MF => Some((value, 0.5)),
                _ => None,
            }
        });
        let (sum, weight) = weighted.fold((0.0, 0.0), |(s, w), (v, wt)| (s + v * wt, w + wt));
        if weight == 0.0 {
            return 0.0;
        }
        sum / weight * Self::completeness(&xi)
    }

    pub fn goalkeeper_strength(&self) -> f32 {
        self.best_xi()
            .first()
            .map(|gk| gk.attributes.goalkeeping as f32 * gk.condition())
            .unwrap_or(0.0)
    }

    pub fn overall_strength(&self) -> f32 {
        0.3 * self.attack_strength()
            + 0.25 * self.midfield_strength()
            + 0.3 * self.defence_strength()
            + 0.15 * self.goalkeeper_strength()
    }

    pub fn strength(&self) -> TeamStrength {
        TeamStrength {
            attack: self.attack_strength(),
            midfield: self.midfield_strength(),
            defence: self.defence_strength(),
            goalkeeper: self.goalkeeper_strength(),
            overall: self.overall_strength(),
        }
    }

    /// Profile for the event engine with the given expected goals
    pub fn match_profile(&self, expected_goals: f32) -> TeamProfile {
        let xi = self.best_xi();
        let scoring_weights = xi
            .iter()
            .map(|p| {
                let base = match p.position {
                    Position::GK => 0.0,
                    Position::DF => 0.3,
                    Position::MF => 1.0,
                    Position::FW => 3.0,
                };
                base * (p.attributes.attacking as f32 / 50.0) * p.condition()
            })
            .collect();

        let mut profile = TeamProfile::new(&self.name, expected_goals).with_midfield(self.midfield_strength());
        profile.lineup = xi.iter().map(|p| p.name.clone()).collect();
        profile.scoring_weights = scoring_weights;
        profile.bench = self.bench(9).iter().map(|p| p.name.clone()).collect();
        profile
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::squad::player::Attributes;

    /// 18-man squad: 2 GK, 6 DF, 6 MF, 4 FW, all rated `level`
    pub(crate) fn squad(name: &str, level: u8) -> SquadTeam {
        let mut team = SquadTeam::new(name, Formation::F442);
        let positions = [
            (Position::GK, 2),
            (Position::DF, 6),
            (Position::MF, 6),
            (Position::FW, 4),
        ];
        let mut id = 1;
        for (position, count) in positions {
            for _ in 0..count {
                let player = Player::new(
                    id,
                    &format!("{} {}{}", name, position, id),
                    position,
                    26,
                    Attributes::uniform(level),
                );
                team.players.push(player);
                id += 1;
            }
        }
        team
    }

    #[test]
    fn test_best_xi_follows_formation() {
        let mut team = squad("Town", 60);
        team.players[3].attributes = Attributes::uniform(90);
        let xi = team.best_xi();

        assert_eq!(xi.len(), 11);
        assert_eq!(xi[0].position, Position::GK);
        assert_eq!(xi.iter().filter(|p| p.position == Position::DF).count(), 4);
        assert_eq!(xi.iter().filter(|p| p.position == Position::FW).count(), 2);
        assert!(xi.iter().any(|p| p.id == 4));
    }

    #[test]
    fn test_unavailable_players_skipped() {
        let mut team = squad("Town", 60);
        for p in team.players.iter_mut().filter(|p| p.position == Position::FW) {
            p.injured = true;
        }
        let xi = team.best_xi();
        assert_eq!(xi.len(), 11);
        assert!(xi.iter().all(|p| p.position != Position::FW));
        assert!(xi.iter().all(|p| p.is_available()));
    }

    #[test]
    fn test_no_keeper_falls_back() {
        let mut team = squad("Town", 60);
        team.players.retain(|p| p.position != Position::GK);
        let xi = team.best_xi();
        assert_eq!(xi.len(), 11);
        assert!(team.goalkeeper_strength() > 0.0);
    }

    #[test]
    fn test_strength_orders_teams() {
        let strong = squad("Strong", 80);
        let weak = squad("Weak", 50);
        assert!(strong.overall_strength() > weak.overall_strength());
        assert!(strong.attack_strength() > weak.attack_strength());
        assert!((strong.goalkeeper_strength() - 80.0).abs() < 1e-3);
    }

    #[test]
    fn test_match_profile() {
        let team = squad("Town", 60);
        let profile = team.match_profile(1.4);
        assert_eq!(profile.lineup.len(), 11);
        assert_eq!(profile.scoring_weights[0], 0.0);
        assert_eq!(profile.bench.len(), 7);
        assert_eq!(profile.expected_goals, 1.4);
    }

    #[test]
    fn test_formation_parse() {
        assert_eq!("4-2-3-1".parse::<Formation>().unwrap(), Formation::F4231);
        assert_eq!(Formation::F352.lines(), (3, 5, 2));
        assert!("2-3-5".parse::<Formation>().is_err());
    }
}
