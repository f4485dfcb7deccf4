use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Condvar, Mutex,
};

use log::debug;

// 箸。隣り合う 2 人の哲学者で共有される
// 誰が持っているかを Mutex で守り、空くのを Condvar で待つ
pub struct Fork {
    id: usize,
    holder: Mutex<Option<usize>>, // 持っている哲学者の席番号
    cond: Condvar,
    grants: AtomicUsize, // 取得に成功した回数
}

// 箸を持っている間だけ存在する型
// drop で箸を置く
pub struct ForkGuard<'a> {
    fork: &'a Fork,
    seat: usize,
}

impl Fork {
    pub fn new(id: usize) -> Self {
        Fork {
            id,
            holder: Mutex::new(None),
            cond: Condvar::new(),
            grants: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    // 空くまでブロックし、空いたら seat のものにする
    pub fn acquire(&self, seat: usize) -> ForkGuard<'_> {
        let mut holder = self.holder.lock().unwrap();
        while holder.is_some() {
            holder = self.cond.wait(holder).unwrap();
        }
        self.grant(&mut holder, seat)
    }

    // 空いていなければ待たずに None
    pub fn try_acquire(&self, seat: usize) -> Option<ForkGuard<'_>> {
        let mut holder = self.holder.lock().unwrap();
        if holder.is_some() {
            return None;
        }
        Some(self.grant(&mut holder, seat))
    }

    fn grant(&self, holder: &mut Option<usize>, seat: usize) -> ForkGuard<'_> {
        *holder = Some(seat);
        self.grants.fetch_add(1, Ordering::Relaxed);
        debug!("fork {} taken by {}", self.id, seat);
        ForkGuard { fork: self, seat }
    }

    // 待っている哲学者のうち高々 1 人を起こす
    // 持ち主以外が置こうとするのは契約違反。ForkGuard の drop からしか呼ばない
    fn release(&self, seat: usize) {
        let mut holder = self.holder.lock().unwrap();
        assert_eq!(
            *holder,
            Some(seat),
            "fork {} released by {} but held by {:?}",
            self.id,
            seat,
            *holder
        );
        *holder = None;
        drop(holder);
        debug!("fork {} released by {}", self.id, seat);
        self.cond.notify_one();
    }

    pub fn holder(&self) -> Option<usize> {
        *self.holder.lock().unwrap()
    }

    pub fn grants(&self) -> usize {
        self.grants.load(Ordering::Relaxed)
    }
}

impl<'a> ForkGuard<'a> {
    pub fn fork(&self) -> &Fork {
        self.fork
    }

    pub fn seat(&self) -> usize {
        self.seat
    }
}

impl<'a> Drop for ForkGuard<'a> {
    fn drop(&mut self) {
        self.fork.release(self.seat);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::{
        sync::{atomic::AtomicBool, Arc},
        thread,
        time::Duration,
    };

    #[test]
    fn test_acquire_release() {
        let fork = Fork::new(3);
        assert_eq!(fork.holder(), None);
        {
            let g = fork.acquire(1);
            assert_eq!(g.seat(), 1);
            assert_eq!(g.fork().id(), 3);
            assert_eq!(fork.holder(), Some(1));
            assert!(fork.try_acquire(2).is_none());
        }
        assert_eq!(fork.holder(), None);
        assert!(fork.try_acquire(2).is_some());
        assert_eq!(fork.grants(), 2);
    }

    #[test]
    #[should_panic]
    fn test_release_by_other_seat() {
        let fork = Fork::new(0);
        let g = fork.acquire(0);
        std::mem::forget(g);
        fork.release(1);
    }

    #[test]
    fn test_acquire_blocks_until_released() {
        let fork = Arc::new(Fork::new(0));
        let released = Arc::new(AtomicBool::new(false));

        let g = fork.acquire(0);
        let fork0 = fork.clone();
        let released0 = released.clone();
        let t = thread::spawn(move || {
            let _g = fork0.acquire(1);
            // 置かれる前に取れてはいけない
            assert!(released0.load(Ordering::SeqCst));
        });

        thread::sleep(Duration::from_millis(50));
        released.store(true, Ordering::SeqCst);
        drop(g);
        t.join().unwrap();
        assert_eq!(fork.grants(), 2);
    }

    #[test]
    fn test_mutual_exclusion() {
        const NUM_THREADS: usize = 4;
        const NUM_LOOP: usize = 10000;

        let fork = Arc::new(Fork::new(0));
        let inside = Arc::new(AtomicUsize::new(0));
        let mut v = Vec::new();

        for seat in 0..NUM_THREADS {
            let fork0 = fork.clone();
            let inside0 = inside.clone();
            v.push(thread::spawn(move || {
                for _ in 0..NUM_LOOP {
                    let _g = fork0.acquire(seat);
                    assert_eq!(inside0.fetch_add(1, Ordering::SeqCst), 0);
                    inside0.fetch_sub(1, Ordering::SeqCst);
                }
            }));
        }

        for t in v {
            t.join().unwrap();
        }
        assert_eq!(fork.grants(), NUM_THREADS * NUM_LOOP);
    }
}
