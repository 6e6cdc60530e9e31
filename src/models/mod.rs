pub mod exam;
pub mod identity;
pub mod message;
pub mod proctoring;
pub mod result;
