pub mod mjd;

pub use mjd::{gmst_deg, minutes_to_duration, ModifiedJulianDate};
