pub mod ops;

pub use ops::CompareRange;
