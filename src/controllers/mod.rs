pub mod human;
pub mod q_paddle;

pub use human::{Direction, HumanController};
pub use q_paddle::{PolicyParameters, QPaddleController};
