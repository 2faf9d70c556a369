pub mod config;
pub mod fib;

pub use config::{ApiConfig, Config, PostgresConfig, RedisConfig, StartupConfig};
pub use fib::{FibSolver, MAX_INDEX, NaiveRecursive};
