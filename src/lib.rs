//! 四則演算（add, subtract, multiply, divide）をMCPツールとして提供するサーバ

pub mod calculator;
pub mod error;
pub mod transport;

pub use calculator::{
    add, divide, evaluate, multiply, subtract, CalculatorService, Envelope, Operation,
};
pub use error::CalcError;
