use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use faceroll_core::pipeline::mode::{Mode, OperatorControls};
use faceroll_core::pipeline::operator_input::OperatorInput;

pub const HELP: &str = "Commands: r = recognize, e = enroll, s = stop, q = quit";

/// How often the reader re-checks queued answers after end of input.
const DRAIN_POLL: Duration = Duration::from_millis(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Recognize,
    Enroll,
    Stop,
    Quit,
    Help,
}

pub fn parse_command(line: &str) -> Option<Command> {
    match line.trim().to_ascii_lowercase().as_str() {
        "r" | "recognize" => Some(Command::Recognize),
        "e" | "enroll" => Some(Command::Enroll),
        "s" | "stop" => Some(Command::Stop),
        "q" | "quit" | "exit" => Some(Command::Quit),
        "h" | "help" | "?" => Some(Command::Help),
        _ => None,
    }
}

fn apply(command: Command, controls: &OperatorControls) {
    match command {
        Command::Recognize => controls.start_recognition(),
        Command::Enroll => controls.start_enrollment(),
        Command::Stop => controls.stop(),
        Command::Quit => controls.request_exit(),
        Command::Help => eprintln!("{HELP}"),
    }
    log::debug!("Operator command {command:?}, mode now {:?}", controls.mode());
}

/// Terminal front-end for operator controls and enrollment prompts.
///
/// A background thread owns stdin. Lines that arrive while a prompt is open
/// are its answers. Otherwise command words are applied to the shared
/// controls, and any other line is held for the next prompt, so answers may
/// be typed or piped ahead of it. End of input requests exit once an
/// enrollment in progress has taken its queued answers; a prompt opened
/// after that is cancelled.
pub struct TerminalConsole {
    answers: Receiver<String>,
    prompting: Arc<AtomicBool>,
}

impl TerminalConsole {
    pub fn spawn(controls: OperatorControls) -> Self {
        Self::from_reader(io::BufReader::new(io::stdin()), controls)
    }

    fn from_reader<R: BufRead + Send + 'static>(reader: R, controls: OperatorControls) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        let prompting = Arc::new(AtomicBool::new(false));
        let reader_prompting = prompting.clone();

        thread::spawn(move || read_lines(reader, &controls, &reader_prompting, &tx));

        Self {
            answers: rx,
            prompting,
        }
    }
}

fn read_lines<R: BufRead>(
    reader: R,
    controls: &OperatorControls,
    prompting: &AtomicBool,
    answers: &Sender<String>,
) {
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        if prompting.load(Ordering::SeqCst) {
            if answers.send(line).is_err() {
                return;
            }
            continue;
        }
        match parse_command(&line) {
            Some(command) => apply(command, controls),
            None if line.trim().is_empty() => {}
            None => {
                log::debug!("Holding {:?} for the next prompt", line.trim());
                if answers.send(line).is_err() {
                    return;
                }
            }
        }
    }

    while !answers.is_empty() && controls.mode() == Mode::Enrolling && !controls.exit_requested()
    {
        thread::sleep(DRAIN_POLL);
    }
    log::info!("Terminal input closed, exiting");
    controls.request_exit();
}

impl OperatorInput for TerminalConsole {
    fn prompt(&mut self, question: &str) -> Option<String> {
        self.prompting.store(true, Ordering::SeqCst);
        eprint!("{question}: ");
        let _ = io::stderr().flush();
        let answer = self.answers.recv().ok();
        self.prompting.store(false, Ordering::SeqCst);
        answer
    }

    fn notify(&mut self, message: &str) {
        eprintln!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::time::Instant;

    fn wait_until(done: impl Fn() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(done());
    }

    fn wait_for_exit(controls: &OperatorControls) {
        wait_until(|| controls.exit_requested());
    }

    #[test]
    fn test_parse_command_aliases() {
        assert_eq!(parse_command("r"), Some(Command::Recognize));
        assert_eq!(parse_command(" Enroll \n"), Some(Command::Enroll));
        assert_eq!(parse_command("S"), Some(Command::Stop));
        assert_eq!(parse_command("exit"), Some(Command::Quit));
        assert_eq!(parse_command("?"), Some(Command::Help));
        assert_eq!(parse_command("dance"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn test_commands_drive_controls_and_eof_exits() {
        let controls = OperatorControls::new();
        let _console = TerminalConsole::from_reader(Cursor::new("e\nr\nbogus\n"), controls.clone());

        wait_for_exit(&controls);
        assert_eq!(controls.mode(), Mode::Recognizing);
    }

    #[test]
    fn test_answers_typed_ahead_reach_the_prompts() {
        let controls = OperatorControls::new();
        let mut console =
            TerminalConsole::from_reader(Cursor::new("e\nAlice\nf\n30\n"), controls.clone());
        wait_until(|| controls.mode() == Mode::Enrolling);

        assert_eq!(console.prompt("Name").as_deref(), Some("Alice"));
        assert_eq!(console.prompt("Gender").as_deref(), Some("f"));
        assert_eq!(console.prompt("Age").as_deref(), Some("30"));

        wait_for_exit(&controls);
        assert_eq!(console.prompt("Name"), None);
    }

    #[test]
    fn test_non_command_line_is_queued_not_applied() {
        let controls = OperatorControls::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        read_lines(Cursor::new("Alice\n\n"), &controls, &AtomicBool::new(false), &tx);

        assert_eq!(rx.try_recv().unwrap(), "Alice");
        assert!(rx.try_recv().is_err());
        assert_eq!(controls.mode(), Mode::Idle);
        assert!(controls.exit_requested());
    }

    #[test]
    fn test_quit_command_requests_exit() {
        let controls = OperatorControls::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        read_lines(Cursor::new("q\n"), &controls, &AtomicBool::new(false), &tx);
        assert!(controls.exit_requested());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_lines_go_to_open_prompt() {
        let controls = OperatorControls::new();
        let (tx, rx) = crossbeam_channel::unbounded();
        read_lines(Cursor::new("r\n"), &controls, &AtomicBool::new(true), &tx);

        assert_eq!(rx.try_recv().unwrap(), "r");
        assert_eq!(controls.mode(), Mode::Idle);
    }

    #[test]
    fn test_prompt_returns_answer() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut console = TerminalConsole {
            answers: rx,
            prompting: Arc::new(AtomicBool::new(false)),
        };
        let prompting = console.prompting.clone();

        let sender = thread::spawn(move || {
            while !prompting.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(1));
            }
            tx.send("Alice".to_string()).unwrap();
        });

        assert_eq!(console.prompt("Name").as_deref(), Some("Alice"));
        assert!(!console.prompting.load(Ordering::SeqCst));
        sender.join().unwrap();
    }

    #[test]
    fn test_prompt_after_input_closed_is_cancel() {
        let (tx, rx) = crossbeam_channel::unbounded::<String>();
        drop(tx);
        let mut console = TerminalConsole {
            answers: rx,
            prompting: Arc::new(AtomicBool::new(false)),
        };
        assert_eq!(console.prompt("Name"), None);
    }
}
