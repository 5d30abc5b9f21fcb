//! Bench input source.
//!
//! On the real kiosk, key and tag events arrive from the keypad scanner and
//! the card reader ISR. On a bench there is only a terminal, so lines on
//! stdin stand in: every keypad character on a line becomes a key event, and
//! `tag <hex-uid>` becomes a tag read.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use surtidor_core::Event;

/// Spawn the stdin reader task. The task ends on EOF or when the session
/// loop goes away.
pub fn spawn_stdin_input(tx: mpsc::Sender<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    for event in parse_line(line.trim()) {
                        if tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    return;
                }
            }
        }
    })
}

fn parse_line(line: &str) -> Vec<Event> {
    if let Some(hex) = line.strip_prefix("tag ") {
        return match u32::from_str_radix(hex.trim(), 16) {
            Ok(uid) => vec![Event::TagScanned(uid)],
            Err(_) => {
                warn!(line, "unrecognized tag value");
                Vec::new()
            }
        };
    }
    line.chars()
        .map(|c| c.to_ascii_uppercase())
        .filter(|c| c.is_ascii_digit() || matches!(c, 'A'..='D'))
        .map(Event::Key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypad_characters_become_key_events() {
        assert_eq!(
            parse_line("12a"),
            vec![Event::Key('1'), Event::Key('2'), Event::Key('A')]
        );
    }

    #[test]
    fn tag_lines_become_tag_events() {
        assert_eq!(parse_line("tag DA983C03"), vec![Event::TagScanned(0xDA98_3C03)]);
        assert!(parse_line("tag zzzz").is_empty());
    }

    #[test]
    fn noise_is_dropped() {
        assert!(parse_line("xyz!").is_empty());
    }
}
