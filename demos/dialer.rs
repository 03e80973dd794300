//! Pooling real TCP connections: a dialer factory and a shutdown closer.

use idlepool::{Pool, PoolConfig};
use std::io::Read;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "idlepool=debug".into()),
        )
        .init();

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let addr = listener.local_addr().unwrap();

    // Accept loop standing in for a remote server.
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            thread::spawn(move || {
                let mut stream = stream;
                let mut buf = [0u8; 64];
                while let Ok(n) = stream.read(&mut buf) {
                    if n == 0 {
                        break;
                    }
                }
            });
        }
    });

    let pool = Pool::new(
        PoolConfig::new(move || TcpStream::connect(addr).map_err(Into::into))
            .with_max_cap(5)
            .with_idle_timeout(Duration::from_secs(15))
            .with_closer(|conn: TcpStream| conn.shutdown(Shutdown::Both).map_err(Into::into)),
    )
    .expect("build pool");

    let mut workers = Vec::new();
    for worker in 0..4 {
        let pool = pool.clone();
        workers.push(thread::spawn(move || {
            for _ in 0..25 {
                let conn = pool.acquire().expect("acquire connection");
                // Real work would happen here.
                pool.release(Some(conn)).expect("release connection");
            }
            println!("worker {worker} done");
        }));
    }

    for worker in workers {
        worker.join().unwrap();
    }

    pool.log_stats();
    pool.shutdown();
}
