//! Wire formats of upstream APIs

pub mod openai;
