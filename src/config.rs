use std::{fmt, str::FromStr, time::Duration};

use clap::ValueEnum;

use crate::error::ConfigError;

// 箸の取り方
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Strategy {
    /// 左 -> 右 の順に取る。全員が同時に左を取るとデッドロックする
    #[default]
    Naive,
    /// 番号の小さい箸から取る（リソース階層）
    Ordered,
    /// 右が取れなければ左を置いてランダムに待つ
    Backoff,
    /// 銀行家のアルゴリズムで安全なときだけ取らせる
    Arbiter,
}

impl Strategy {
    pub fn is_hardened(self) -> bool {
        self != Strategy::Naive
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::Naive => "naive",
            Strategy::Ordered => "ordered",
            Strategy::Backoff => "backoff",
            Strategy::Arbiter => "arbiter",
        };
        f.write_str(s)
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Strategy as ValueEnum>::from_str(s, true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub philosophers: usize,
    pub meals: usize,
    pub think: Duration,
    pub eat: Duration,
    pub strategy: Strategy,
}

impl Default for Config {
    // 5 人が 3 回ずつ、1 秒考えて 2 秒食べる
    fn default() -> Self {
        Config {
            philosophers: 5,
            meals: 3,
            think: Duration::from_secs(1),
            eat: Duration::from_secs(2),
            strategy: Strategy::Naive,
        }
    }
}

impl Config {
    pub fn new(philosophers: usize, meals: usize) -> Self {
        Config {
            philosophers,
            meals,
            ..Default::default()
        }
    }

    pub fn with_durations(mut self, think: Duration, eat: Duration) -> Self {
        self.think = think;
        self.eat = eat;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    // 1 人だと箸が 1 本しかなく、左右 2 本を取れない
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.philosophers < 2 {
            return Err(ConfigError::TooFewPhilosophers(self.philosophers));
        }
        if self.meals == 0 {
            return Err(ConfigError::NoMeals);
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_is_reference_scenario() {
        let c = Config::default();
        assert_eq!(c.philosophers, 5);
        assert_eq!(c.meals, 3);
        assert_eq!(c.strategy, Strategy::Naive);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        assert_eq!(
            Config::new(1, 3).validate(),
            Err(ConfigError::TooFewPhilosophers(1))
        );
        assert_eq!(
            Config::new(0, 3).validate(),
            Err(ConfigError::TooFewPhilosophers(0))
        );
        assert_eq!(Config::new(2, 0).validate(), Err(ConfigError::NoMeals));
        assert!(Config::new(2, 1).validate().is_ok());
    }

    #[test]
    fn test_strategy_parse() {
        for s in [
            Strategy::Naive,
            Strategy::Ordered,
            Strategy::Backoff,
            Strategy::Arbiter,
        ] {
            assert_eq!(s.to_string().parse::<Strategy>(), Ok(s));
        }
        assert_eq!("ORDERED".parse::<Strategy>(), Ok(Strategy::Ordered));
        assert!("waiter".parse::<Strategy>().is_err());
        assert!(!Strategy::Naive.is_hardened());
        assert!(Strategy::Arbiter.is_hardened());
    }
}
