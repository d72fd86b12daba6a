pub mod camera;
pub mod image_writer;
