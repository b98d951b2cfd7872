pub mod overlays;
pub mod sparklines;
pub mod status;
