//! Line-based play loop over stdin/stdout.

use std::io::BufRead;

use quiz_core::model::{FinalizeReport, QuestionKind, Submission};
use services::{Presentation, RunOutcome, RunnerEvent, RunnerInput, SessionRunner};
use tokio::sync::mpsc;

/// Play one session to the end, reading answers line by line.
///
/// `:q` or end of input quits.
pub async fn play(runner: SessionRunner) -> Result<RunOutcome, Box<dyn std::error::Error>> {
    let (input_tx, input_rx) = mpsc::channel(16);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let session = tokio::spawn(runner.run(input_rx, event_tx));

    // A plain thread so a pending read does not hold up runtime shutdown.
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    let mut input_tx = Some(input_tx);
    let mut current: Option<Presentation> = None;

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    RunnerEvent::Presented(p) => {
                        print_question(&p);
                        current = Some(p);
                    }
                    RunnerEvent::TimeLeft { remaining, .. } => {
                        if remaining <= 5 || remaining % 10 == 0 {
                            println!("  ⏱ {remaining}s");
                        }
                    }
                    RunnerEvent::Answered(feedback) => {
                        let record = &feedback.record;
                        if record.result.is_correct() {
                            println!("  ✓ +{} (streak {})", record.points_earned, feedback.streak);
                        } else {
                            println!("  ✗ {} is \"{}\"  hearts: {}", record.symbol, record.expected, feedback.hearts);
                        }
                        current = None;
                    }
                    RunnerEvent::Finished(report) => print_report(&report),
                    RunnerEvent::Abandoned(_) => println!("session abandoned"),
                }
            }
            line = line_rx.recv(), if input_tx.is_some() => {
                let Some(line) = line else {
                    input_tx = None;
                    continue;
                };
                let input = if line.trim() == ":q" {
                    Some(RunnerInput::Quit)
                } else {
                    current.as_ref().map(|p| RunnerInput::Answer {
                        token: p.token,
                        submission: Submission::value(resolve_choice(p, &line)),
                    })
                };
                if let (Some(input), Some(tx)) = (input, input_tx.as_ref()) {
                    if tx.send(input).await.is_err() {
                        input_tx = None;
                    }
                }
            }
        }
    }

    Ok(session.await?)
}

/// Map a numbered choice to its option text; anything else is taken as typed.
fn resolve_choice(p: &Presentation, line: &str) -> String {
    let trimmed = line.trim();
    let picked = match (&p.instance.options, trimmed.parse::<usize>()) {
        (Some(options), Ok(n)) => n.checked_sub(1).and_then(|i| options.get(i)),
        _ => None,
    };
    picked.cloned().unwrap_or_else(|| trimmed.to_owned())
}

fn print_question(p: &Presentation) {
    let hearts = "♥".repeat(p.hearts as usize);
    let timer = p
        .remaining_secs
        .map(|secs| format!("  {secs}s"))
        .unwrap_or_default();
    println!();
    println!(
        "[{} left] {hearts}{timer}  ({} pts)",
        p.remaining_questions, p.instance.points_remaining
    );
    match p.instance.kind {
        QuestionKind::Mcq => {
            println!("  What is {} ?", p.instance.unit.symbol);
            if let Some(options) = &p.instance.options {
                for (i, option) in options.iter().enumerate() {
                    println!("    {}. {option}", i + 1);
                }
            }
        }
        QuestionKind::Writing | QuestionKind::Drag => {
            println!(
                "  Write the sound of {} ({})",
                p.instance.unit.symbol, p.instance.unit.label
            );
        }
    }
}

fn print_report(report: &FinalizeReport) {
    println!();
    if report.game_over {
        println!("Game over.");
    } else {
        println!("Session complete!");
    }
    println!(
        "Score {}/{}  {}",
        report.total_score,
        report.max_possible_score,
        "★".repeat(usize::from(report.star_rating.stars()))
    );
    println!(
        "Hearts used {}  time {}s  answers {}",
        report.hearts_used,
        report.time_spent_secs,
        report.answer_log.len()
    );
    if !report.badges.is_empty() {
        let badges: Vec<&str> = report.badges.iter().map(String::as_str).collect();
        println!("Badges: {}", badges.join(", "));
    }
}
