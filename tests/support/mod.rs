//! Helpers shared by the container-backed tests.

pub mod osrm_dataset;
