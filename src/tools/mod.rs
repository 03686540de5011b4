mod checksum;
mod exif_reader;
mod fs_tools;

pub use checksum::file_checksum;
pub use exif_reader::read_capture_time;
pub use fs_tools::{base_name, ensure_directory_exists, file_extension, validate_directory_exists};

#[cfg(test)]
pub(crate) use exif_reader::write_tiff_with_datetime;
