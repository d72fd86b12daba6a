pub mod mood_mirror_use_case;
pub mod session_logger;
