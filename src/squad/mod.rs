//! Squad management
//!
//! Players with attribute ratings, formations, best-eleven selection and
//! team strength ratings that feed the simulators.

pub mod manager;
pub mod player;
pub mod team;

pub use manager::{StrengthRow, TeamManager};
pub use player::{Attributes, Player, Position};
pub use team::{Formation, SquadTeam, TeamStrength};

const HOME_ADVANTAGE: f32 = 1.1;

/// Expected goals for both sides from squad strengths.
///
/// Each side's attack is compared with the other's defence (goalkeeper
/// included) and scaled around the league average, with a small midfield
/// term for territorial control.
pub fn expected_goals_from_strength(home: &TeamStrength, away: &TeamStrength, league_avg: f32) -> (f32, f32) {
    let resistance = |s: &TeamStrength| (0.75 * s.defence + 0.25 * s.goalkeeper).max(1.0);
    let control = (home.midfield.max(1.0) / away.midfield.max(1.0)).sqrt();

    let home_xg = league_avg * HOME_ADVANTAGE * (home.attack.max(1.0) / resistance(away)).powf(1.5) * control;
    let away_xg = league_avg / HOME_ADVANTAGE * (away.attack.max(1.0) / resistance(home)).powf(1.5) / control;

    (home_xg.clamp(0.2, 5.0), away_xg.clamp(0.2, 5.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::squad::team::tests::squad;

    #[test]
    fn test_equal_squads_get_home_edge() {
        let a = squad("A", 65).strength();
        let b = squad("B", 65).strength();
        let (home, away) = expected_goals_from_strength(&a, &b, 1.35);
        assert!((home - 1.35 * 1.1).abs() < 1e-3);
        assert!(home > away);
    }

    #[test]
    fn test_stronger_attack_scores_more() {
        let strong = squad("Strong", 85).strength();
        let weak = squad("Weak", 50).strength();
        let (home, away) = expected_goals_from_strength(&weak, &strong, 1.35);
        assert!(away > home);
        assert!(away <= 5.0 && home >= 0.2);
    }
}
