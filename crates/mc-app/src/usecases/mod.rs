pub mod securejoin;
