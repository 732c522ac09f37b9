#![allow(dead_code)]

pub mod stores;
pub mod strategies;

pub use stores::*;
pub use strategies::*;
