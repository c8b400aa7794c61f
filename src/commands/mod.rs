pub mod batch;
pub mod evaluate;
pub mod prompt;
pub mod record;
pub mod runs;
pub mod score;
pub mod status;

mod output;
