//! Utility functions and types

pub mod frame;

pub use frame::{column_names, column_values, features_to_array2, series_to_array1};
