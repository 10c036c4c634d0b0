use std::{fmt, str::FromStr};

use crate::error::{Error, Result};

pub const PLANES: usize = 6;
pub const SQUARES: usize = 64;
pub const INPUT_DIM: usize = PLANES * SQUARES + 1;
pub const TEMPO: usize = PLANES * SQUARES;

pub type FeatureVector = [f32; INPUT_DIM];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn flip(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }
}

/// The six FEN fields. Only `placement` and `side` are required when parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub placement: String,
    pub side: Side,
    pub castling: String,
    pub en_passant: String,
    pub halfmove: u32,
    pub fullmove: u32,
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(fen: &str) -> Result<Self> {
        let mut fields = fen.split_whitespace();

        let placement = fields.next().ok_or_else(|| Error::format(fen, "empty"))?;
        let side = match fields.next() {
            Some("w") => Side::White,
            Some("b") => Side::Black,
            Some(other) => return Err(Error::format(fen, format!("side to move `{other}`"))),
            None => return Err(Error::format(fen, "missing side to move")),
        };

        let castling = fields.next().unwrap_or("-");
        let en_passant = fields.next().unwrap_or("-");
        let halfmove = parse_clock(fen, fields.next(), 0)?;
        let fullmove = parse_clock(fen, fields.next(), 1)?;

        Ok(Self {
            placement: placement.to_string(),
            side,
            castling: castling.to_string(),
            en_passant: en_passant.to_string(),
            halfmove,
            fullmove,
        })
    }
}

fn parse_clock(fen: &str, field: Option<&str>, default: u32) -> Result<u32> {
    match field {
        None => Ok(default),
        Some(s) => s.parse().map_err(|_| Error::format(fen, format!("clock `{s}`"))),
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::White => 'w',
            Side::Black => 'b',
        };
        write!(
            f,
            "{} {side} {} {} {} {}",
            self.placement, self.castling, self.en_passant, self.halfmove, self.fullmove
        )
    }
}

fn plane_of(piece: char) -> Option<usize> {
    match piece.to_ascii_uppercase() {
        'P' => Some(0),
        'N' => Some(1),
        'B' => Some(2),
        'R' => Some(3),
        'Q' => Some(4),
        'K' => Some(5),
        _ => None,
    }
}

/// Piece-major encoding: `[P 64][N 64][B 64][R 64][Q 64][K 64][tempo]`,
/// +1 for white pieces, -1 for black, tempo +1 when white is to move.
pub fn encode(pos: &Position) -> Result<FeatureVector> {
    let mut x = [0.0; INPUT_DIM];

    let ranks: Vec<&str> = pos.placement.split('/').collect();
    if ranks.len() != 8 {
        return Err(Error::format(&pos.to_string(), format!("{} ranks (expected 8)", ranks.len())));
    }

    for (rank, row) in ranks.iter().enumerate() {
        let mut file = 0;
        for ch in row.chars() {
            if let Some(empty) = ch.to_digit(10) {
                file += empty as usize;
            } else if let Some(plane) = plane_of(ch) {
                if file < 8 {
                    let sign = if ch.is_ascii_uppercase() { 1.0 } else { -1.0 };
                    x[plane * SQUARES + rank * 8 + file] = sign;
                }
                file += 1;
            }

            if file > 8 {
                break;
            }
        }

        if file != 8 {
            return Err(Error::format(
                &pos.to_string(),
                format!("rank {rank} has {file} files (expected 8)"),
            ));
        }
    }

    x[TEMPO] = match pos.side {
        Side::White => 1.0,
        Side::Black => -1.0,
    };

    Ok(x)
}

/// Hands every piece to the other colour and passes the move. The twin's
/// side-to-move score is the negation of the original's.
pub fn color_swap(pos: &Position) -> Position {
    let swap_case = |c: char| {
        if c.is_ascii_uppercase() {
            c.to_ascii_lowercase()
        } else {
            c.to_ascii_uppercase()
        }
    };

    Position {
        placement: pos.placement.chars().map(swap_case).collect(),
        side: pos.side.flip(),
        castling: if pos.castling == "-" {
            pos.castling.clone()
        } else {
            pos.castling.chars().map(swap_case).collect()
        },
        en_passant: "-".to_string(),
        halfmove: pos.halfmove,
        fullmove: pos.fullmove,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    fn pos(fen: &str) -> Position {
        fen.parse().unwrap()
    }

    #[test]
    fn parse_fills_missing_fields() {
        let p = pos("8/8/8/8/8/8/8/K6k b");
        assert_eq!(p.side, Side::Black);
        assert_eq!(p.to_string(), "8/8/8/8/8/8/8/K6k b - - 0 1");
    }

    #[test]
    fn parse_rejects_bad_side() {
        assert!("8/8/8/8/8/8/8/K6k x".parse::<Position>().is_err());
        assert!("8/8/8/8/8/8/8/K6k".parse::<Position>().is_err());
        assert!("".parse::<Position>().is_err());
    }

    #[test]
    fn one_entry_per_occupied_square() {
        for fen in [STARTPOS, KIWIPETE] {
            let p = pos(fen);
            let x = encode(&p).unwrap();

            let mut occupied = [None; SQUARES];
            for (rank, row) in p.placement.split('/').enumerate() {
                let mut file = 0;
                for ch in row.chars() {
                    if let Some(n) = ch.to_digit(10) {
                        file += n as usize;
                    } else {
                        occupied[rank * 8 + file] = Some(ch);
                        file += 1;
                    }
                }
            }

            for sq in 0..SQUARES {
                let nonzero: Vec<f32> =
                    (0..PLANES).map(|pl| x[pl * SQUARES + sq]).filter(|v| *v != 0.0).collect();
                match occupied[sq] {
                    Some(ch) => {
                        let sign = if ch.is_ascii_uppercase() { 1.0 } else { -1.0 };
                        assert_eq!(nonzero, vec![sign], "square {sq}");
                    }
                    None => assert!(nonzero.is_empty(), "square {sq}"),
                }
            }
            assert_eq!(x[TEMPO], 1.0);
        }
    }

    #[test]
    fn startpos_layout() {
        let x = encode(&pos(STARTPOS)).unwrap();
        // a8 black rook, e1 white king, a2 white pawn
        assert_eq!(x[3 * SQUARES], -1.0);
        assert_eq!(x[5 * SQUARES + 60], 1.0);
        assert_eq!(x[48], 1.0);
        assert_eq!(x.iter().filter(|v| **v != 0.0).count(), 33);
    }

    #[test]
    fn tempo_follows_side() {
        let x = encode(&pos("8/8/8/8/8/8/8/K6k b - - 0 1")).unwrap();
        assert_eq!(x[TEMPO], -1.0);
    }

    #[test]
    fn bad_rank_is_format_error() {
        for fen in [
            "rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1",
            "rnbqkbnr/ppppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1",
            "rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w - - 0 1",
            "8/8/8/8/8/8/8 w - - 0 1",
        ] {
            assert!(matches!(encode(&pos(fen)), Err(Error::Format { .. })), "{fen}");
        }
    }

    #[test]
    fn unknown_letters_are_skipped() {
        let x = encode(&pos("8/8/8/8/8/8/8/K6kx w - - 0 1")).unwrap();
        assert_eq!(x[5 * SQUARES + 56], 1.0);
        assert_eq!(x[5 * SQUARES + 63], -1.0);
    }

    #[test]
    fn color_swap_fields() {
        let p = pos("r3k2r/8/8/3pP3/8/8/8/R3K2R w Kq d6 3 40");
        let s = color_swap(&p);
        assert_eq!(s.to_string(), "R3K2R/8/8/3Pp3/8/8/8/r3k2r b kQ - 3 40");
        assert_eq!(color_swap(&pos("8/8/8/8/8/8/8/K6k w - - 0 1")).castling, "-");
    }

    #[test]
    fn color_swap_is_structural_involution() {
        for fen in [STARTPOS, KIWIPETE] {
            let p = pos(fen);
            let twice = color_swap(&color_swap(&p));
            assert_eq!(encode(&twice).unwrap(), encode(&p).unwrap());
        }
    }

    #[test]
    fn color_swap_negates_features() {
        let p = pos(KIWIPETE);
        let x = encode(&p).unwrap();
        let y = encode(&color_swap(&p)).unwrap();
        for i in 0..INPUT_DIM {
            assert_eq!(x[i], -y[i]);
        }
    }
}
