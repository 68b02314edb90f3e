//! I/O operations for reading and writing vector data

mod geojson_io;

pub use geojson_io::{parse_geojson, read_geojson, to_geojson_string, write_geojson};
