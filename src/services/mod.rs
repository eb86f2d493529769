pub mod cli_swapper;
pub mod driver;
pub mod library_swapper;
pub mod process;
#[cfg(feature = "python-engine")]
pub mod python_engine;
pub mod staging;
pub mod swapper;
pub mod sweeper;
