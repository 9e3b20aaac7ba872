//! Rule engine for rock-paper-scissors.
//!
//! A pure, deterministic mapping from two submitted moves to a round result.
//! The beats relation is the usual odd cycle: rock beats scissors, scissors
//! beats paper, paper beats rock.

use std::str::FromStr;

use strum::{Display, EnumIter, EnumString};
use tracing::instrument;

use crate::GameError;

/// A valid move in the choice set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum Choice {
    /// Rock beats scissors.
    Rock,
    /// Paper beats rock.
    Paper,
    /// Scissors beats paper.
    Scissors,
}

impl Choice {
    /// The choice this one defeats.
    #[instrument]
    pub fn beats(self) -> Self {
        match self {
            Self::Rock => Self::Scissors,
            Self::Scissors => Self::Paper,
            Self::Paper => Self::Rock,
        }
    }

    /// Parses a raw move string, normalizing case.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidChoice`] for anything outside the choice
    /// set.
    #[instrument(skip(raw), fields(raw = %raw))]
    pub fn parse(raw: &str) -> Result<Self, GameError> {
        Self::from_str(raw.trim()).map_err(|_| GameError::InvalidChoice {
            choice: raw.to_string(),
        })
    }
}

/// Result of one round between two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundResult {
    /// Both players picked the same choice.
    Draw,
    /// The first player's choice won.
    Player1,
    /// The second player's choice won.
    Player2,
}

/// Determines the result between two raw move strings.
///
/// # Errors
///
/// Returns [`GameError::InvalidChoice`] if either move is outside the choice
/// set.
#[instrument]
pub fn play(p1_choice: &str, p2_choice: &str) -> Result<RoundResult, GameError> {
    let p1 = Choice::parse(p1_choice)?;
    let p2 = Choice::parse(p2_choice)?;

    if p1 == p2 {
        return Ok(RoundResult::Draw);
    }

    if p1.beats() == p2 {
        Ok(RoundResult::Player1)
    } else {
        Ok(RoundResult::Player2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn same_choice_draws() {
        for choice in Choice::iter() {
            let name = choice.to_string();
            assert_eq!(play(&name, &name).unwrap(), RoundResult::Draw);
        }
    }

    #[test]
    fn distinct_choices_are_complementary() {
        for a in Choice::iter() {
            for b in Choice::iter() {
                if a == b {
                    continue;
                }
                let forward = play(&a.to_string(), &b.to_string()).unwrap();
                let reverse = play(&b.to_string(), &a.to_string()).unwrap();
                match forward {
                    RoundResult::Player1 => assert_eq!(reverse, RoundResult::Player2),
                    RoundResult::Player2 => assert_eq!(reverse, RoundResult::Player1),
                    RoundResult::Draw => panic!("distinct choices must not draw"),
                }
            }
        }
    }

    #[test]
    fn beats_relation_is_the_classic_cycle() {
        assert_eq!(play("rock", "scissors").unwrap(), RoundResult::Player1);
        assert_eq!(play("scissors", "paper").unwrap(), RoundResult::Player1);
        assert_eq!(play("paper", "rock").unwrap(), RoundResult::Player1);
    }

    #[test]
    fn parse_normalizes_case() {
        assert_eq!(play("ROCK", "Scissors").unwrap(), RoundResult::Player1);
        assert_eq!(Choice::parse("  PaPeR  ").unwrap(), Choice::Paper);
    }

    #[test]
    fn invalid_choice_rejected_regardless_of_other_argument() {
        assert!(matches!(
            play("lizard", "rock"),
            Err(GameError::InvalidChoice { .. })
        ));
        assert!(matches!(
            play("rock", "spock"),
            Err(GameError::InvalidChoice { .. })
        ));
        assert!(matches!(
            play("lizard", "spock"),
            Err(GameError::InvalidChoice { .. })
        ));
    }
}
