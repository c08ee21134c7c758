// See <https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>

pub mod anticipation;
pub mod concurrency;
pub mod utils;
pub mod warmup;

pub use utils::*;
