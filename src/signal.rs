use std::{io, sync::Arc, thread};

use libc::SIGUSR1;
use log::debug;
use signal_hook::iterator::Signals;

use crate::table::{Status, Table};

// SIGUSR1 を受け取るたびに食卓の様子を dump に渡す
// 止まってしまった素朴な実行を外から覗くためのもの
pub fn spawn_status_dump<F>(table: Arc<Table>, mut dump: F) -> io::Result<()>
where
    F: FnMut(Status) + Send + 'static,
{
    let mut signals = Signals::new([SIGUSR1])?;
    thread::spawn(move || {
        for sig in signals.forever() {
            debug!("received signal: {:?}", sig);
            dump(table.status());
        }
    });
    Ok(())
}
