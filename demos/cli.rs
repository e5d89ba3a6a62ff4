//! Terminal demo for the visible-light modem library.
//!
//! Mirrors the original program's `main()` prompt loop ("Type an address to
//! send to:" / "Type a message to send:") but runs against two
//! [`vlc_modem::testing::LoopbackBus`] endpoints instead of real GPIO/ADC
//! hardware, so it's runnable anywhere. This binary is a demo, not part of
//! the library's public contract — the library itself never touches argv or
//! stdin.
//!
//! Run with `cargo run --bin vlc-cli --features cli`.

use std::io::{self, BufRead, Write};

use vlc_modem::frame::NodeAddr;
use vlc_modem::link::{Link, LinkConfig};
use vlc_modem::testing::LoopbackBus;

const MY_ID: u8 = 2;
const PEER_ID: u8 = 3;

fn main() {
    env_logger::init();

    let bus = LoopbackBus::new();
    let my_id = NodeAddr::new(MY_ID).expect("MY_ID is a valid 4-bit address");
    let peer_id = NodeAddr::new(PEER_ID).expect("PEER_ID is a valid 4-bit address");

    let mut link = Link::new(bus.endpoint(MY_ID, 20_000), LinkConfig { my_id })
        .expect("calibration against an idle loopback bus");
    let calibration = link.calibration();
    println!("Config:");
    println!("Beacon period: {} us", vlc_modem::consts::BEACON_PERIOD_US);
    println!("PPM period: {} us", vlc_modem::consts::PPM_PERIOD_US);
    println!("PPM {} bits", vlc_modem::consts::PPM_BITS);
    println!("Packet max period: {} us", vlc_modem::consts::PACKET_PERIOD_US);
    println!(
        "calibrated high cutoff: {:.3}v (mean {:.3}v, stddev {:.3}v)",
        calibration.high_cutoff, calibration.mean, calibration.stddev
    );

    let peer = Link::new(bus.endpoint(PEER_ID, 20_000), LinkConfig { my_id: peer_id })
        .expect("calibration against an idle loopback bus");
    peer.start_receiver(move |from, to, payload| {
        println!(
            "(node {peer_id}) ({from} -> {to}) MSG RECEIVED ({}): {:?}",
            payload.len(),
            String::from_utf8_lossy(payload)
        );
    });

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("Type an address to send to: ");
        io::stdout().flush().ok();
        let Some(Ok(line)) = lines.next() else {
            break;
        };
        let line = line.trim();
        if line == "quit" || line == "exit" {
            break;
        }

        let to = match line.parse::<u8>().ok().and_then(|v| NodeAddr::new(v).ok()) {
            Some(addr) => addr,
            None => {
                println!("invalid address. Please try again.");
                continue;
            }
        };

        print!("Type a message to send: ");
        io::stdout().flush().ok();
        let Some(Ok(message)) = lines.next() else {
            break;
        };

        println!("Attempting to send {message:?} ({MY_ID}->{to})...");
        match link.send(message.as_bytes(), to, true) {
            Ok(acks) if acks.is_empty() => println!("NO ACK"),
            Ok(acks) => {
                for addr in acks.iter() {
                    println!("We got an ack from {addr}");
                }
            }
            Err(err) => println!("FAIL: {err}"),
        }
    }

    peer.stop();
}
