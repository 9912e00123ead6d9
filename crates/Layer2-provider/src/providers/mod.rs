//! Provider implementations

pub mod openai;
