pub mod peerstate_mapper;
pub mod token_mapper;

pub use peerstate_mapper::PeerstateRowMapper;
pub use token_mapper::TokenRowMapper;
