pub mod footprints;
pub mod health;

pub use footprints::{
    create_footprint, delete_footprint, get_footprint, list_footprints, update_footprint,
};
pub use health::health_check;
