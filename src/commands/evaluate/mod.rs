mod run;
mod selection;
#[cfg(test)]
mod tests;

pub use self::run::{CONSISTENCY_METRIC, run};
