//! Venue implementations

pub mod paper;

pub use paper::PaperVenue;
