//! Push/pull pipeline demo: one ventilator, two workers, poll-driven drain.
//!
//! Run with `RUST_LOG=debug cargo run --example pipeline` for engine traces.

use xemsg::{poll, Domain, Flags, Interest, Pattern, PollEntry, Result, Socket};

fn main() -> Result<()> {
    xemsg::dev_tracing::init_tracing();

    let worker_a = Socket::new(Domain::Sp, Pattern::Pull)?;
    let worker_b = Socket::new(Domain::Sp, Pattern::Pull)?;
    worker_a.bind("inproc://pipeline-a")?;
    worker_b.bind("inproc://pipeline-b")?;

    let ventilator = Socket::new(Domain::Sp, Pattern::Push)?;
    ventilator.connect("inproc://pipeline-a")?;
    ventilator.connect("inproc://pipeline-b")?;

    for i in 0..10 {
        ventilator.send(format!("task-{i}"), Flags::NONE)?;
    }

    let mut drained = 0;
    while drained < 10 {
        let mut entries = [
            PollEntry::new(&worker_a, Interest::READABLE),
            PollEntry::new(&worker_b, Interest::READABLE),
        ];
        let ready = poll(&mut entries, 1000)?;
        if ready == 0 {
            println!("poll timed out with {drained} tasks drained");
            break;
        }
        for (name, entry) in ["a", "b"].iter().zip(entries.iter()) {
            if entry.readable() {
                let task = entry.socket().recv(Flags::DONTWAIT);
                if let Ok(task) = task {
                    println!("worker {name}: {}", String::from_utf8_lossy(&task));
                    drained += 1;
                }
            }
        }
    }

    Ok(())
}
