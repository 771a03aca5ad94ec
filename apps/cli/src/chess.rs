//! SAN move application via the chess-rules collaborator.
//!
//! Everything that knows chess legality lives here; the core only ever
//! sees opaque tokens.

use shakmaty::fen::Fen;
use shakmaty::san::San;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChessError {
    #[error("invalid SAN move '{token}' at ply {ply}")]
    InvalidSan { token: String, ply: usize },

    #[error("invalid FEN: {0}")]
    InvalidFen(String),
}

/// Apply one SAN token to a position.
pub fn apply_san(position: Chess, token: &str, ply: usize) -> Result<Chess, ChessError> {
    let invalid = || ChessError::InvalidSan {
        token: token.to_string(),
        ply,
    };
    let san: San = token.parse().map_err(|_| invalid())?;
    let mv = san.to_move(&position).map_err(|_| invalid())?;
    position.play(&mv).map_err(|_| invalid())
}

/// Play a whole line from the starting position, validating every token.
pub fn final_position(tokens: &[String]) -> Result<Chess, ChessError> {
    let mut position = Chess::default();
    for (ply, token) in tokens.iter().enumerate() {
        position = apply_san(position, token, ply)?;
    }
    Ok(position)
}

pub fn fen(position: &Chess) -> String {
    Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
}

pub fn position_from_fen(s: &str) -> Result<Chess, ChessError> {
    let fen: Fen = s.parse().map_err(|_| ChessError::InvalidFen(s.to_string()))?;
    fen.into_position(CastlingMode::Standard)
        .map_err(|_| ChessError::InvalidFen(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opening_core::tokenize;

    #[test]
    fn legal_line_plays_out() {
        let tokens = tokenize("e4 e5 Nf3 Nc6 d4 exd4 Nxd4");
        let position = final_position(&tokens).unwrap();
        assert!(fen(&position).contains(" b "));
    }

    #[test]
    fn illegal_token_reports_its_ply() {
        let tokens = tokenize("e4 e5 Ke2 Ke7 Qh9");
        let err = final_position(&tokens).unwrap_err();
        // Ke2 is legal; the garbage token is ply 4.
        assert!(matches!(
            err,
            ChessError::InvalidSan { ref token, ply: 4 } if token == "Qh9"
        ));
    }

    #[test]
    fn start_position_round_trips_through_fen() {
        let start = Chess::default();
        let parsed = position_from_fen(&fen(&start)).unwrap();
        assert_eq!(fen(&parsed), fen(&start));
        assert!(position_from_fen("not a fen").is_err());
    }
}
