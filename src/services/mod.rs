pub mod environment_service;
pub mod exam_service;
pub mod export_service;
pub mod identity_service;
pub mod import_service;
pub mod memory_store;
pub mod pg_store;
pub mod result_service;
pub mod session_service;
