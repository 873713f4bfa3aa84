//! Folding a closed round into the roster.

use tracing::debug;

use super::ScoringRules;
use crate::models::{Player, Round};
use crate::ranking;

/// Apply every resolved game of `round` to the contestants who played it,
/// then refresh all tie-break scores.
///
/// The bye is not on the roster, so it records nothing; its opponent records
/// the bye like any other game.
pub(super) fn apply_round(players: &[Player], round: &Round, scoring: ScoringRules) -> Vec<Player> {
    let updated: Vec<Player> = players
        .iter()
        .map(|player| {
            let Some(game) = round.game_of(player.number) else {
                return player.clone();
            };
            let (Some(side), Some(opponent)) =
                (game.side_of(player.number), game.opponent_of(player.number))
            else {
                return player.clone();
            };
            let Some(result) = game.outcome.result_for(side) else {
                return player.clone();
            };

            debug!(
                round = round.number,
                player = player.number,
                opponent,
                result = %result,
                "Recording game"
            );
            player
                .clone()
                .record_game(opponent, side, result, scoring.points(result))
        })
        .collect();

    ranking::with_opponent_scores(&updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Game, GameResult, Outcome, PairingQuality, Side, BYE_NUMBER};

    #[test]
    fn test_apply_round_updates_both_sides() {
        let players = vec![
            Player::new(1, "A"),
            Player::new(2, "B"),
            Player::new(3, "C"),
        ];
        let round = Round::new(
            1,
            vec![
                Game::new(1, 1, 2).with_outcome(Outcome::BlackWins),
                Game::new(2, 3, BYE_NUMBER),
            ],
            PairingQuality::Standard,
        );

        let updated = apply_round(&players, &round, ScoringRules::default());

        assert_eq!(updated[0].score, 0);
        assert_eq!(updated[0].played_results, vec![GameResult::Loss]);
        assert_eq!(updated[0].opponent_score, 2);
        assert_eq!(updated[1].score, 2);
        assert_eq!(updated[1].played_sides, vec![Side::Black]);
        assert_eq!(updated[2].score, 2);
        assert_eq!(updated[2].played_opponents, vec![BYE_NUMBER]);
        assert_eq!(updated[2].opponent_score, 0);
    }

    #[test]
    fn test_apply_round_skips_absent_players() {
        let players = vec![Player::new(1, "A"), Player::new(9, "Late")];
        let round = Round::new(
            1,
            vec![Game::new(1, 1, BYE_NUMBER)],
            PairingQuality::Standard,
        );

        let updated = apply_round(&players, &round, ScoringRules::default());
        assert_eq!(updated[1].rounds_played(), 0);
    }
}
