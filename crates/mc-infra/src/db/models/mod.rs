pub mod peerstate_row;
pub mod token_row;

pub use peerstate_row::{NewPeerstateRow, PeerstateRow};
pub use token_row::{NewTokenRow, TokenRow};
