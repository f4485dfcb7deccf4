use std::{sync::Arc, thread, time::Duration};

use log::{info, warn};
use tokio::sync::oneshot;

use crate::{
    config::Config,
    error::ConfigError,
    observer::{Observer, Silent},
    table::{Report, Status, Table},
};

#[derive(Debug)]
pub enum Outcome {
    Completed(Report),
    // 制限時間内に終わらなかった。そのときの様子を持つ
    Deadlocked(Status),
    // 哲学者のスレッドが panic した
    Aborted,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// 食卓を別スレッドで動かし、limit だけ待つ
///
/// 止まった哲学者のスレッドを止める手段はないので、デッドロック時はそのまま放置する
pub async fn run(table: Arc<Table>, limit: Duration) -> Outcome {
    let (tx, rx) = oneshot::channel();

    let t = table.clone();
    thread::spawn(move || {
        let report = t.run();
        if tx.send(report).is_err() {
            info!("dinner finished after the watchdog gave up");
        }
    });

    match tokio::time::timeout(limit, rx).await {
        Ok(Ok(report)) => Outcome::Completed(report),
        // 送信側が send せずに drop された
        Ok(Err(_)) => Outcome::Aborted,
        Err(_) => {
            let status = table.status();
            warn!("dinner did not finish within {:?}\n{}", limit, status);
            Outcome::Deadlocked(status)
        }
    }
}

// 同じ設定で何回か動かした結果
#[derive(Debug, Default)]
pub struct Tally {
    pub completed: Vec<Report>,
    pub hung: usize,
    pub aborted: usize, // デッドロックではなく panic で終わった回数
}

impl Tally {
    pub fn runs(&self) -> usize {
        self.completed.len() + self.hung + self.aborted
    }
}

// 同じ設定で runs 回動かし、終わったものと止まったものを数える
pub async fn hang_rate(
    config: &Config,
    runs: usize,
    limit: Duration,
) -> Result<Tally, ConfigError> {
    hang_rate_with(config, runs, limit, || Arc::new(Silent) as Arc<dyn Observer>).await
}

// 回ごとに observer を作り直す
pub async fn hang_rate_with<F>(
    config: &Config,
    runs: usize,
    limit: Duration,
    observer: F,
) -> Result<Tally, ConfigError>
where
    F: Fn() -> Arc<dyn Observer>,
{
    let mut tally = Tally::default();
    for i in 0..runs {
        let table = Arc::new(Table::with_observer(config.clone(), observer())?);
        match run(table, limit).await {
            Outcome::Completed(report) => tally.completed.push(report),
            Outcome::Deadlocked(_) => {
                info!("run {i}: deadlocked");
                tally.hung += 1;
            }
            Outcome::Aborted => {
                info!("run {i}: aborted");
                tally.aborted += 1;
            }
        }
    }
    Ok(tally)
}
