pub mod backend_factory;
pub mod deepface_backend;
pub mod deepface_response;
pub mod expression_backend;
pub mod face_mesh_backend;
pub mod null_backend;
pub mod onnx_ferplus_classifier;
