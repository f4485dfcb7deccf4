use std::{
    fmt,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use log::info;

use crate::{
    config::Config,
    error::ConfigError,
    fork::Fork,
    observer::{Observer, Printer},
    philosopher::{Context, Phase, Philosopher, Protocol, SeatState},
};

// 食卓。箸の輪と哲学者を持ち、全員が食べ終わるまで待つ
pub struct Table {
    config: Config,
    forks: Vec<Arc<Fork>>,
    philosophers: Vec<Philosopher>,
    seats: Vec<Arc<SeatState>>,
    ctx: Arc<Context>,
}

// ある瞬間の食卓の様子
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub phases: Vec<Phase>,
    pub holders: Vec<Option<usize>>, // 箸番号 -> 持っている席
    pub meals: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub meals: Vec<usize>,
    pub grants: Vec<usize>, // 箸ごとの取得回数
    pub elapsed: Duration,
}

impl Table {
    /// 設定を検証して食卓を用意する。ここではまだ誰も動き出さない
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        Table::with_observer(config, Arc::new(Printer))
    }

    pub fn with_observer(config: Config, observer: Arc<dyn Observer>) -> Result<Self, ConfigError> {
        config.validate()?;
        let n = config.philosophers;

        let forks: Vec<_> = (0..n).map(|i| Arc::new(Fork::new(i))).collect();
        let seats: Vec<_> = (0..n).map(|_| Arc::new(SeatState::new())).collect();

        // 右の箸は次の席の左の箸
        let philosophers = (0..n)
            .map(|i| {
                Philosopher::new(
                    i,
                    forks[i].clone(),
                    forks[(i + 1) % n].clone(),
                    seats[i].clone(),
                )
            })
            .collect();

        let ctx = Arc::new(Context {
            meals: config.meals,
            think: config.think,
            eat: config.eat,
            protocol: Protocol::new(config.strategy, n),
            observer,
        });

        Ok(Table {
            config,
            forks,
            philosophers,
            seats,
            ctx,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn philosophers(&self) -> &[Philosopher] {
        &self.philosophers
    }

    pub fn forks(&self) -> &[Arc<Fork>] {
        &self.forks
    }

    // 全員が食べ終わるまで戻らない
    // Strategy::Naive ではデッドロックして永遠に戻らないことがある
    pub fn run(&self) -> Report {
        info!(
            "{} philosophers sit down for {} meals each ({})",
            self.config.philosophers, self.config.meals, self.config.strategy
        );
        let start = Instant::now();

        // 全員を起動してから待つ
        let mut v = Vec::new();
        for p in &self.philosophers {
            let p = p.clone();
            let ctx = self.ctx.clone();
            let t = thread::spawn(move || p.dine(&ctx));
            v.push(t);
        }

        for t in v {
            t.join().unwrap();
        }

        let report = Report {
            meals: self.seats.iter().map(|s| s.meals()).collect(),
            grants: self.forks.iter().map(|f| f.grants()).collect(),
            elapsed: start.elapsed(),
        };
        info!("dinner finished in {:?}", report.elapsed);
        self.ctx.observer.all_done();
        report
    }

    pub fn status(&self) -> Status {
        Status {
            phases: self.seats.iter().map(|s| s.phase()).collect(),
            holders: self.forks.iter().map(|f| f.holder()).collect(),
            meals: self.seats.iter().map(|s| s.meals()).collect(),
        }
    }
}

impl Status {
    // 全員が箸待ちで、箸が全部取られている
    pub fn is_circular_wait(&self) -> bool {
        self.phases.iter().all(|p| *p == Phase::Hungry) && self.holders.iter().all(|h| h.is_some())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (seat, (phase, meals)) in self.phases.iter().zip(&self.meals).enumerate() {
            writeln!(f, "philosopher {seat}: {phase} ({meals} meals)")?;
        }
        for (fork, holder) in self.holders.iter().enumerate() {
            match holder {
                Some(seat) => writeln!(f, "fork {fork}: held by {seat}")?,
                None => writeln!(f, "fork {fork}: free")?,
            }
        }
        if self.is_circular_wait() {
            writeln!(f, "circular wait: every philosopher holds one fork")?;
        }
        Ok(())
    }
}
