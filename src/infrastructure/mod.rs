pub mod scratch;
pub mod swapper;
