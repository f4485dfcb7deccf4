use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use rand::Rng;

use crate::{
    banker::Banker,
    config::Strategy,
    fork::{Fork, ForkGuard},
    observer::{Event, EventKind, Observer},
};

// バックオフ時に待つ時間の上限
const MAX_BACKOFF_MICROS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Thinking,
    Hungry, // 箸待ち
    Eating,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Thinking => "thinking",
            Phase::Hungry => "waiting-for-forks",
            Phase::Eating => "eating",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

// 外から覗ける席の状態
pub struct SeatState {
    phase: Mutex<Phase>,
    meals: AtomicUsize,
}

impl SeatState {
    pub fn new() -> Self {
        SeatState {
            phase: Mutex::new(Phase::Thinking),
            meals: AtomicUsize::new(0),
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap()
    }

    pub fn meals(&self) -> usize {
        self.meals.load(Ordering::Relaxed)
    }
}

impl Default for SeatState {
    fn default() -> Self {
        SeatState::new()
    }
}

// 箸の取り方と、それに必要な共有物
#[derive(Clone)]
pub enum Protocol {
    Naive,
    Ordered,
    Backoff,
    Arbiter(Banker),
}

impl Protocol {
    pub fn new(strategy: Strategy, n: usize) -> Self {
        match strategy {
            Strategy::Naive => Protocol::Naive,
            Strategy::Ordered => Protocol::Ordered,
            Strategy::Backoff => Protocol::Backoff,
            Strategy::Arbiter => Protocol::Arbiter(Banker::for_ring(n)),
        }
    }

    fn banker(&self) -> Option<&Banker> {
        match self {
            Protocol::Arbiter(banker) => Some(banker),
            _ => None,
        }
    }
}

// 全員で共有する食事のルール
pub struct Context {
    pub meals: usize,
    pub think: Duration,
    pub eat: Duration,
    pub protocol: Protocol,
    pub observer: Arc<dyn Observer>,
}

#[derive(Clone)]
pub struct Philosopher {
    seat: usize,
    left: Arc<Fork>,  // seat 番
    right: Arc<Fork>, // (seat + 1) % n 番
    state: Arc<SeatState>,
}

impl Philosopher {
    pub fn new(seat: usize, left: Arc<Fork>, right: Arc<Fork>, state: Arc<SeatState>) -> Self {
        assert_ne!(left.id(), right.id());
        Philosopher {
            seat,
            left,
            right,
            state,
        }
    }

    pub fn seat(&self) -> usize {
        self.seat
    }

    pub fn left(&self) -> &Fork {
        &self.left
    }

    pub fn right(&self) -> &Fork {
        &self.right
    }

    // 考えて食べるを決められた回数だけ繰り返す
    pub fn dine(&self, ctx: &Context) {
        for meal in 1..=ctx.meals {
            self.think(ctx);
            self.eat(ctx, meal);
        }
        self.enter(ctx, Phase::Done, EventKind::Done);
    }

    fn think(&self, ctx: &Context) {
        self.enter(ctx, Phase::Thinking, EventKind::Thinking);
        thread::sleep(ctx.think);
    }

    fn eat(&self, ctx: &Context, meal: usize) {
        self.enter(ctx, Phase::Hungry, EventKind::Hungry);
        let (left, right) = self.take_forks(ctx);

        self.enter(
            ctx,
            Phase::Eating,
            EventKind::Eating {
                meal,
                of: ctx.meals,
            },
        );
        thread::sleep(ctx.eat);
        self.state.meals.fetch_add(1, Ordering::Relaxed);

        // 右、左の順に置く
        self.put(ctx, right);
        self.put(ctx, left);
        ctx.observer.notify(&self.event(EventKind::Ate));
    }

    // (左, 右) の順で返す
    fn take_forks(&self, ctx: &Context) -> (ForkGuard<'_>, ForkGuard<'_>) {
        match &ctx.protocol {
            // 全員が同時に左を取ると、右を永遠に待つことになる
            Protocol::Naive => {
                let left = self.take(ctx, &self.left);
                let right = self.take(ctx, &self.right);
                (left, right)
            }
            Protocol::Ordered => {
                if self.left.id() < self.right.id() {
                    let left = self.take(ctx, &self.left);
                    let right = self.take(ctx, &self.right);
                    (left, right)
                } else {
                    // 輪の最後の席だけ右 (0 番) が先になる
                    let right = self.take(ctx, &self.right);
                    let left = self.take(ctx, &self.left);
                    (left, right)
                }
            }
            Protocol::Backoff => self.take_with_backoff(ctx),
            Protocol::Arbiter(banker) => {
                // 銀行家が許可した箸は他の誰も持っていないので、すぐ取れる
                banker.take_blocking(self.seat, self.left.id());
                let left = self.take(ctx, &self.left);
                banker.take_blocking(self.seat, self.right.id());
                let right = self.take(ctx, &self.right);
                (left, right)
            }
        }
    }

    fn take_with_backoff(&self, ctx: &Context) -> (ForkGuard<'_>, ForkGuard<'_>) {
        let mut rng = rand::thread_rng();
        loop {
            let left = self.take(ctx, &self.left);
            if let Some(right) = self.right.try_acquire(self.seat) {
                ctx.observer
                    .notify(&self.event(EventKind::Took(self.right.id())));
                return (left, right);
            }

            // 右が取れなかったので左を置いて出直す
            self.put(ctx, left);
            let us = rng.gen_range(0..=MAX_BACKOFF_MICROS);
            thread::sleep(Duration::from_micros(us));
        }
    }

    fn take<'a>(&self, ctx: &Context, fork: &'a Fork) -> ForkGuard<'a> {
        let guard = fork.acquire(self.seat);
        ctx.observer.notify(&self.event(EventKind::Took(fork.id())));
        guard
    }

    fn put(&self, ctx: &Context, guard: ForkGuard<'_>) {
        let id = guard.fork().id();
        ctx.observer.notify(&self.event(EventKind::Put(id)));
        drop(guard);
        if let Some(banker) = ctx.protocol.banker() {
            banker.release(self.seat, id);
        }
    }

    fn enter(&self, ctx: &Context, phase: Phase, kind: EventKind) {
        *self.state.phase.lock().unwrap() = phase;
        ctx.observer.notify(&self.event(kind));
    }

    fn event(&self, kind: EventKind) -> Event {
        Event {
            seat: self.seat,
            kind,
        }
    }
}
