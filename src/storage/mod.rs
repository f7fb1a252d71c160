//! Host-side filesystem locations for Nsbox

pub mod paths;

pub use paths::*;
