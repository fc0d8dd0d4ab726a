//! Stage 03: supervised multi-label training.

pub mod trainer;

pub use trainer::ModelTrainer;
