#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod chunker;
pub mod config;
pub mod error;
pub mod retry;
pub mod traits;
pub mod types;
pub mod vecmath;

pub use error::{Error, Result};
