use thiserror::Error;

// 設定値の検証エラー
// シミュレーション開始前にしか発生しない
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("at least 2 philosophers are required, got {0}")]
    TooFewPhilosophers(usize),

    #[error("each philosopher must eat at least once")]
    NoMeals,
}
