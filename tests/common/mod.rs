#![allow(dead_code, unused_imports)]

pub use solwatch_test_utils::*;

use serde_json::Value;
use solwatch::channel::ChildEnd;
use solwatch::protocol::Outbound;

/// Behaves like a correct solution for "sum the comma separated numbers":
/// one result per case, then `done`; exits 0 on the final `done`.
pub fn summing_child() -> Script {
    script(|mut end: ChildEnd| async move {
        while let Some(frame) = end.next_request().await {
            match frame {
                Outbound::Request(req) => {
                    let sum: i64 = req
                        .input
                        .split(',')
                        .filter_map(|n| n.trim().parse::<i64>().ok())
                        .sum();
                    end.result(Value::from(sum), 0.001).await;
                    end.done().await;
                }
                Outbound::Done => return 0,
            }
        }
        0
    })
}

/// Answers every case with the given results and then `done`.
pub fn replying_child(answers: Vec<Value>, exit_code: i32) -> Script {
    script(move |mut end: ChildEnd| {
        let answers = answers.clone();
        async move {
            while let Some(frame) = end.next_request().await {
                match frame {
                    Outbound::Request(_) => {
                        for a in answers.iter() {
                            end.result(a.clone(), 0.001).await;
                        }
                        end.done().await;
                    }
                    Outbound::Done => return exit_code,
                }
            }
            exit_code
        }
    })
}
