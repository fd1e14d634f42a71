//! Collection of squads with JSON persistence

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::player::Player;
use super::team::{SquadTeam, TeamStrength};
use crate::{FootballError, Result};

/// Strength ratings for one team, as listed by `strength_table`
#[derive(Debug, Clone, Serialize)]
pub struct StrengthRow {
    pub team: String,
    pub strength: TeamStrength,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamManager {
    teams: Vec<SquadTeam>,
}

impl TeamManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let manager: TeamManager = serde_json::from_str(&content)?;
        log::debug!(
            "Loaded {} squads from {}",
            manager.teams.len(),
            path.as_ref().display()
        );
        Ok(manager)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn teams(&self) -> &[SquadTeam] {
        &self.teams
    }

    pub fn add_team(&mut self, team: SquadTeam) -> Result<()> {
        if self.teams.iter().any(|t| t.name.eq_ignore_ascii_case(&team.name)) {
            return Err(FootballError::Squad(format!("Team {} already exists", team.name)));
        }
        self.teams.push(team);
        Ok(())
    }

    pub fn remove_team(&mut self, name: &str) -> Result<SquadTeam> {
        let index = self.index_of(name)?;
        Ok(self.teams.remove(index))
    }

    pub fn team(&self, name: &str) -> Result<&SquadTeam> {
        let index = self.index_of(name)?;
        Ok(&self.teams[index])
    }

    pub fn team_mut(&mut self, name: &str) -> Result<&mut SquadTeam> {
        let index = self.index_of(name)?;
        Ok(&mut self.teams[index])
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.teams
            .iter()
            .position(|t| t.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| FootballError::UnknownTeam(name.to_string()))
    }

    pub fn add_player(&mut self, team: &str, player: Player) -> Result<()> {
        let team = self.team_mut(team)?;
        if team.player(player.id).is_some() {
            return Err(FootballError::Squad(format!(
                "Player {} already in {}",
                player.id, team.name
            )));
        }
        team.players.push(player);
        Ok(())
    }

    pub fn remove_player(&mut self, team: &str, player_id: u32) -> Result<Player> {
        let team = self.team_mut(team)?;
        let index = team
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or_else(|| FootballError::Squad(format!("No player {} in {}", player_id, team.name)))?;
        Ok(team.players.remove(index))
    }

    /// Move a player between squads; nothing changes on error
    pub fn transfer(&mut self, player_id: u32, from: &str, to: &str) -> Result<()> {
        let to_index = self.index_of(to)?;
        let from_index = self.index_of(from)?;
        if from_index == to_index {
            return Err(FootballError::Squad(format!(
                "Cannot transfer within {}",
                self.teams[from_index].name
            )));
        }
        if self.teams[to_index].player(player_id).is_some() {
            return Err(FootballError::Squad(format!(
                "Player {} already in {}",
                player_id, self.teams[to_index].name
            )));
        }

        let player = self.remove_player(from, player_id)?;
        log::info!(
            "Transferred {} from {} to {}",
            player.name,
            self.teams[from_index].name,
            self.teams[to_index].name
        );
        self.teams[to_index].players.push(player);
        Ok(())
    }

    /// Teams ranked by overall strength, strongest first
    pub fn strength_table(&self) -> Vec<StrengthRow> {
        let mut rows: Vec<StrengthRow> = self
            .teams
            .iter()
            .map(|t| StrengthRow {
                team: t.name.clone(),
                strength: t.strength(),
            })
            .collect();
        rows.sort_by(|a, b| b.strength.overall.total_cmp(&a.strength.overall));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squad::team::tests::squad;

    fn manager() -> TeamManager {
        let mut manager = TeamManager::new();
        manager.add_team(squad("Rovers", 70)).unwrap();
        manager.add_team(squad("United", 55)).unwrap();
        manager
    }

    #[test]
    fn test_duplicate_team_rejected() {
        let mut manager = manager();
        assert!(matches!(
            manager.add_team(squad("rovers", 60)),
            Err(FootballError::Squad(_))
        ));
    }

    #[test]
    fn test_transfer() {
        let mut manager = manager();
        // Player ids overlap between the generated squads
        let mut signing = manager.remove_player("United", 18).unwrap();
        signing.id = 100;
        manager.add_player("United", signing).unwrap();

        manager.transfer(100, "United", "Rovers").unwrap();
        assert_eq!(manager.team("Rovers").unwrap().players.len(), 19);
        assert_eq!(manager.team("United").unwrap().players.len(), 17);

        // Id 1 exists in both squads
        assert!(manager.transfer(1, "United", "Rovers").is_err());
        assert_eq!(manager.team("United").unwrap().players.len(), 17);
        assert!(manager.transfer(999, "United", "City").is_err());
    }

    #[test]
    fn test_strength_table_sorted() {
        let table = manager().strength_table();
        assert_eq!(table[0].team, "Rovers");
        assert!(table[0].strength.overall > table[1].strength.overall);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("squads.json");
        let original = manager();
        original.save_json(&path).unwrap();

        let loaded = TeamManager::load_json(&path).unwrap();
        assert_eq!(loaded.teams().len(), 2);
        assert_eq!(loaded.team("United").unwrap().players, original.team("United").unwrap().players);
        assert!(matches!(loaded.team("City"), Err(FootballError::UnknownTeam(_))));
    }
}
