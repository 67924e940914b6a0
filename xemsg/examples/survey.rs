//! Survey demo: a surveyor binds in the background with a `BindTask`, two
//! respondents answer, and the surveyor gathers both responses.

use xemsg::{BindTask, Domain, Flags, Pattern, Result, Socket};

fn main() -> Result<()> {
    xemsg::dev_tracing::init_tracing();

    let surveyor = Socket::new(Domain::Sp, Pattern::Surveyor)?;
    let mut task = BindTask::spawn(&surveyor, "inproc://survey-demo")?;

    // The caller is free to do other work while the bind is outstanding.
    let endpoint = loop {
        match task.try_join()? {
            Some(endpoint) => break endpoint,
            None => std::thread::yield_now(),
        }
    };
    println!("surveyor bound (endpoint id {})", endpoint.value());

    let respondents: Vec<Socket> = (0..2)
        .map(|_| {
            let r = Socket::new(Domain::Sp, Pattern::Respondent)?;
            r.connect("inproc://survey-demo")?;
            Ok(r)
        })
        .collect::<Result<_>>()?;

    surveyor.send("who is awake?", Flags::NONE)?;
    for (i, r) in respondents.iter().enumerate() {
        let question = r.recv(Flags::NONE)?;
        println!("respondent {i} got: {}", String::from_utf8_lossy(&question));
        r.send(format!("respondent-{i} is awake"), Flags::NONE)?;
    }

    for _ in 0..respondents.len() {
        let answer = surveyor.recv(Flags::NONE)?;
        println!("surveyor heard: {}", String::from_utf8_lossy(&answer));
    }

    Ok(())
}
