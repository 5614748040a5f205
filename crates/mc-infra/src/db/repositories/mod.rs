mod peerstate_repo;
mod token_repo;

pub use peerstate_repo::*;
pub use token_repo::*;
