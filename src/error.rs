/// 計算処理で発生するエラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("Cannot divide by zero")]
    DivisionByZero,

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}
