pub mod background;
pub mod edge_smoothing;
pub mod encoder;
pub mod notification;
pub mod params;
pub mod pipeline;
pub mod raster_source;
pub mod summed_area_table;
