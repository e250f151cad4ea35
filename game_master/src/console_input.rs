use std::io::stdin;
use std::thread;

use tokio::sync::mpsc::{self, Receiver};

use crate::console_cmd::ConsoleCmd;

/// Reads operator commands on a dedicated thread.
pub fn console_input_thread() -> Receiver<ConsoleCmd> {
    let (sender, receiver) = mpsc::channel(16);
    thread::spawn(move || {
        pollster::block_on(console_input_loop(sender))
    });
    receiver
}

pub async fn console_input_loop(sender: mpsc::Sender<ConsoleCmd>) {
    loop {
        let mut input = String::new();
        match stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("console closed: {e}");
                break;
            }
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        match ConsoleCmd::parse(input) {
            Ok(cmd) => {
                if sender.send(cmd).await.is_err() {
                    break;
                }
            }
            Err(e) => println!("error: {e}"),
        }
    }
}
