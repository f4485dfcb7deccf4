use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{Arc, Barrier, Mutex},
};

use log::debug;

use crate::config::Strategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Thinking,
    Hungry,
    Took(usize), // 箸番号
    Put(usize),  // 箸番号。実際に置く直前に通知される
    Eating { meal: usize, of: usize },
    Ate,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub seat: usize,
    pub kind: EventKind,
}

/// 哲学者の状態遷移を受け取る
///
/// 哲学者のスレッドから直接呼ばれるので、ここでブロックするとその哲学者も止まる
pub trait Observer: Send + Sync {
    fn notify(&self, event: &Event);

    fn all_done(&self) {}
}

// 進捗を標準出力に流す
pub struct Printer;

impl Printer {
    // 1 行にする遷移だけ Some
    pub fn line(event: &Event) -> Option<String> {
        let seat = event.seat;
        match event.kind {
            EventKind::Thinking => Some(format!("philosopher {seat} is thinking")),
            EventKind::Hungry => Some(format!("philosopher {seat} is waiting for forks")),
            EventKind::Eating { meal, of } => {
                Some(format!("philosopher {seat} is eating (meal {meal}/{of})"))
            }
            EventKind::Ate => Some(format!("philosopher {seat} finished eating")),
            EventKind::Done => Some(format!("philosopher {seat} is done")),
            EventKind::Took(_) | EventKind::Put(_) => None,
        }
    }
}

impl Observer for Printer {
    fn notify(&self, event: &Event) {
        match Printer::line(event) {
            Some(line) => println!("{line}"),
            None => debug!("philosopher {}: {:?}", event.seat, event.kind),
        }
    }

    fn all_done(&self) {
        println!("all philosophers have finished their meals");
    }
}

pub struct Silent;

impl Observer for Silent {
    fn notify(&self, _event: &Event) {}
}

#[derive(Default)]
struct Log {
    events: Vec<Event>,
    holders: HashMap<usize, usize>, // 箸番号 -> 席番号
    eating: BTreeSet<usize>,
    together: HashSet<(usize, usize)>, // 同時に食べていた組
    max_eating: usize,
    finished: bool,
}

// 起きたことを全部覚えておく。テストでの検証用
#[derive(Default)]
pub struct Recorder {
    log: Mutex<Log>,
}

impl Recorder {
    pub fn new() -> Self {
        Recorder::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().events.clone()
    }

    // seat が食べ終えた回数
    pub fn meals(&self, seat: usize) -> usize {
        self.log
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.seat == seat && e.kind == EventKind::Ate)
            .count()
    }

    // a と b が同じ瞬間に食べていたことがあるか
    pub fn ate_together(&self, a: usize, b: usize) -> bool {
        let key = (a.min(b), a.max(b));
        self.log.lock().unwrap().together.contains(&key)
    }

    pub fn max_eating(&self) -> usize {
        self.log.lock().unwrap().max_eating
    }

    pub fn all_done_seen(&self) -> bool {
        self.log.lock().unwrap().finished
    }
}

impl Observer for Recorder {
    fn notify(&self, event: &Event) {
        let mut log = self.log.lock().unwrap();
        let seat = event.seat;
        match event.kind {
            EventKind::Took(fork) => {
                // 箸は 1 人しか持てない
                if let Some(other) = log.holders.insert(fork, seat) {
                    panic!("fork {fork} taken by {seat} while held by {other}");
                }
            }
            EventKind::Put(fork) => {
                assert_eq!(log.holders.remove(&fork), Some(seat));
                // 1 本目を置いた時点で食事は終わっている
                log.eating.remove(&seat);
            }
            EventKind::Eating { .. } => {
                let pairs: Vec<_> = log
                    .eating
                    .iter()
                    .map(|&other| (other.min(seat), other.max(seat)))
                    .collect();
                log.together.extend(pairs);
                log.eating.insert(seat);
                log.max_eating = log.max_eating.max(log.eating.len());
            }
            _ => {}
        }
        log.events.push(*event);
    }

    fn all_done(&self) {
        self.log.lock().unwrap().finished = true;
    }
}

// 各哲学者が最初の 1 本を取ったところで、k 人そろうまで待たせる
// Strategy::Naive で k = n にすると必ず輪ができる
pub struct Rendezvous {
    barrier: Barrier,
    pending: Mutex<(Vec<bool>, usize)>, // (まだ 1 本も取っていない席, 残りの待ち人数)
    inner: Arc<dyn Observer>,
}

impl Rendezvous {
    pub fn new(n: usize, k: usize, inner: Arc<dyn Observer>) -> Self {
        assert!(k <= n);
        Rendezvous {
            barrier: Barrier::new(k),
            pending: Mutex::new((vec![true; n], k)),
            inner,
        }
    }

    // 同時に最初の 1 本を持てる最大人数でそろえる
    // Ordered では 0 番を 2 人が取り合い、Arbiter では最後の 1 人が待たされる
    pub fn for_strategy(strategy: Strategy, n: usize, inner: Arc<dyn Observer>) -> Self {
        let k = match strategy {
            Strategy::Naive | Strategy::Backoff => n,
            Strategy::Ordered | Strategy::Arbiter => n - 1,
        };
        Rendezvous::new(n, k, inner)
    }
}

impl Observer for Rendezvous {
    fn notify(&self, event: &Event) {
        self.inner.notify(event);

        if let EventKind::Took(_) = event.kind {
            let wait = {
                let mut pending = self.pending.lock().unwrap();
                let (first, remaining) = &mut *pending;
                if std::mem::replace(&mut first[event.seat], false) && *remaining > 0 {
                    *remaining -= 1;
                    true
                } else {
                    false
                }
            };
            if wait {
                self.barrier.wait();
            }
        }
    }

    fn all_done(&self) {
        self.inner.all_done();
    }
}
