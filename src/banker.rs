use std::sync::{Arc, Condvar, Mutex};

use log::debug;

// 銀行家のアルゴリズム
// 席数は実行時に決まるので、配列ではなく Vec で持つ
#[derive(Debug)]
struct Resource {
    // 利用可能なリソース
    available: Vec<usize>,
    // スレッドごとの確保中のリソース
    allocation: Vec<Vec<usize>>,
    // 各スレッドが必要とするリソースの最大値
    needed: Vec<Vec<usize>>,
}

impl Resource {
    fn new(available: Vec<usize>, needed: Vec<Vec<usize>>) -> Self {
        assert!(needed.iter().all(|n| n.len() == available.len()));
        let allocation = vec![vec![0; available.len()]; needed.len()];
        Resource {
            available,
            allocation,
            needed,
        }
    }

    // 現在の状態がデッドロック or 飢餓状態に陥らないか
    fn is_safe(&self) -> bool {
        // 各スレッドがリソース取得と解放に成功したか
        let mut finish = vec![false; self.needed.len()];
        // 利用可能なリソースのシミュレート値
        let mut work = self.available.clone();

        loop {
            // この周回で最後まで進めるスレッドを見つけられたか
            let mut progressed = false;

            for (i, alloc) in self.allocation.iter().enumerate() {
                if finish[i] {
                    continue;
                }

                let is_available = self.needed[i]
                    .iter()
                    .zip(alloc)
                    .map(|(m, a)| m - a)
                    .zip(&work)
                    .all(|(n, w)| *w >= n);

                if is_available {
                    // 必要なリソースをすべて借り切ったので、すべて返却する
                    finish[i] = true;
                    progressed = true;
                    for (w, a) in work.iter_mut().zip(alloc) {
                        *w += *a;
                    }
                }
            }

            if !progressed {
                return finish.iter().all(|f| *f);
            }
        }
    }

    // t_id 番目のスレッドが r_id 番目のリソースを必要単位取得可能か
    fn take(&mut self, t_id: usize, r_id: usize) -> bool {
        assert!(t_id < self.needed.len() && r_id < self.available.len());

        let res = self.needed[t_id][r_id] - self.allocation[t_id][r_id];

        // 既に割り当てが完了している場合
        if res == 0 {
            return true;
        }

        // 必要量が割り当て可能なリソース量を超過している場合
        if self.available[r_id] < res {
            return false;
        }

        // リソースの割り当てをして、それが safe な状態かチェックする
        self.available[r_id] -= res;
        self.allocation[t_id][r_id] += res;

        if self.is_safe() {
            true
        } else {
            // 遷移先が safe 状態じゃなかったので、状態を戻す
            self.allocation[t_id][r_id] -= res;
            self.available[r_id] += res;
            false
        }
    }

    fn release(&mut self, t_id: usize, r_id: usize) {
        assert!(t_id < self.needed.len() && r_id < self.available.len());

        let res = self.allocation[t_id][r_id];
        self.allocation[t_id][r_id] -= res;
        self.available[r_id] += res;
    }
}

// 箸の割り当てを一手に引き受ける調停役
#[derive(Clone)]
pub struct Banker {
    resource: Arc<Mutex<Resource>>,
    cond: Arc<Condvar>,
}

impl Banker {
    pub fn new(available: Vec<usize>, needed: Vec<Vec<usize>>) -> Self {
        Banker {
            resource: Arc::new(Mutex::new(Resource::new(available, needed))),
            cond: Arc::new(Condvar::new()),
        }
    }

    // n 本の箸が輪になっていて、哲学者 i は i 番と (i + 1) % n 番を 1 本ずつ必要とする
    pub fn for_ring(n: usize) -> Self {
        let needed = (0..n)
            .map(|i| {
                let mut need = vec![0; n];
                need[i] = 1;
                need[(i + 1) % n] = 1;
                need
            })
            .collect();
        Banker::new(vec![1; n], needed)
    }

    pub fn take(&self, t_id: usize, r_id: usize) -> bool {
        let mut r = self.resource.lock().unwrap();
        r.take(t_id, r_id)
    }

    // 安全に割り当てられるようになるまで待つ
    pub fn take_blocking(&self, t_id: usize, r_id: usize) {
        let mut r = self.resource.lock().unwrap();
        while !r.take(t_id, r_id) {
            debug!("banker: {} must wait for {}", t_id, r_id);
            r = self.cond.wait(r).unwrap();
        }
    }

    pub fn release(&self, t_id: usize, r_id: usize) {
        let mut r = self.resource.lock().unwrap();
        r.release(t_id, r_id);
        // 誰が進めるようになったかわからないので全員起こす
        self.cond.notify_all();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn test_is_safe() {
        let resource = Resource {
            available: vec![0, 1],
            allocation: vec![vec![1, 0], vec![0, 0]],
            needed: vec![vec![1, 1], vec![1, 1]],
        };

        assert!(resource.is_safe())
    }

    #[test]
    fn test_is_safe2() {
        let resource = Resource {
            available: vec![0, 1],
            allocation: vec![vec![0, 0], vec![1, 0]],
            needed: vec![vec![1, 1], vec![1, 1]],
        };

        assert!(resource.is_safe())
    }

    #[test]
    fn test_circular_wait_is_unsafe() {
        // 2 人がそれぞれ 1 本ずつ持っている
        let resource = Resource {
            available: vec![0, 0],
            allocation: vec![vec![1, 0], vec![0, 1]],
            needed: vec![vec![1, 1], vec![1, 1]],
        };

        assert!(!resource.is_safe())
    }

    #[test]
    fn test_ring_refuses_last_left_fork() {
        let n = 5;
        let banker = Banker::for_ring(n);

        // n - 1 人までは左の箸を取れる
        for i in 0..n - 1 {
            assert!(banker.take(i, i));
        }
        // 最後の 1 人が左を取ると輪ができる
        assert!(!banker.take(n - 1, n - 1));

        // 誰かが右を取って食べ終われば取れる
        assert!(banker.take(n - 2, n - 1));
        banker.release(n - 2, n - 2);
        banker.release(n - 2, n - 1);
        assert!(banker.take(n - 1, n - 1));
    }

    #[test]
    fn test_take_is_idempotent() {
        let banker = Banker::for_ring(3);
        assert!(banker.take(0, 0));
        assert!(banker.take(0, 0));
        // 必要としていないリソースは常に取得済み扱い
        assert!(banker.take(0, 2));
    }

    #[test]
    fn test_take_blocking() {
        const NUM_LOOP: usize = 1000;

        let banker = Banker::for_ring(2);
        let banker0 = banker.clone();

        // 左右逆順に取っても止まらない
        let philosopher0 = thread::spawn(move || {
            for _ in 0..NUM_LOOP {
                banker0.take_blocking(0, 0);
                banker0.take_blocking(0, 1);
                banker0.release(0, 0);
                banker0.release(0, 1);
            }
        });

        let philosopher1 = thread::spawn(move || {
            for _ in 0..NUM_LOOP {
                banker.take_blocking(1, 1);
                banker.take_blocking(1, 0);
                banker.release(1, 1);
                banker.release(1, 0);
            }
        });

        philosopher0.join().unwrap();
        philosopher1.join().unwrap();
    }
}
