use serde::{Deserialize, Serialize};

/// Side of the court a paddle defends.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// The loser value recorded when this side misses the ball.
    pub fn as_loser(self) -> Loser {
        match self {
            Side::Left => Loser::Left,
            Side::Right => Loser::Right,
        }
    }
}

/// Which side let the ball through, if any.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum Loser {
    #[default]
    None,
    Left,
    Right,
}

impl Loser {
    pub fn is(self, side: Side) -> bool {
        self == side.as_loser()
    }
}
