pub mod footprint;

pub use footprint::{Footprint, FootprintPatch, FootprintRecord, NewFootprint};
