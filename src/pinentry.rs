use std::{
    io::{BufRead, BufReader, ErrorKind, Write},
    path::PathBuf,
    process::{Command, Stdio},
};

use dialoguer::{Input, theme::ColorfulTheme};
use tracing::{debug, info};

use crate::{config::Config, dispatch, error::PromptError};

/// `GPG_ERR_CANCELED`, carried in the low 16 bits of an Assuan error code
const GPG_ERR_CANCELED: u32 = 99;

/// What to show the human when asking for a one-time code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRequest {
    pub prompt: String,
    pub description: String,
}

impl PinRequest {
    pub fn for_mfa_device(program_name: &str, serial: &str) -> Self {
        Self {
            prompt: format!("AWS MFA for {program_name}"),
            description: format!("Enter MFA token for {serial}"),
        }
    }
}

/// Interactive source of MFA codes
pub trait PinPrompt {
    fn get_pin(&self, request: &PinRequest) -> Result<String, PromptError>;
}

/// Pick `pinentry` when it can be found, otherwise prompt on the terminal
pub fn default_prompt(config: &Config) -> Box<dyn PinPrompt> {
    match dispatch::look_path(&config.pinentry_program) {
        Ok(program) => {
            debug!("Using pinentry program {}", program.display());
            Box::new(Pinentry::new(program))
        }
        Err(_) => {
            info!(
                "{} not found, prompting on the terminal",
                config.pinentry_program
            );
            Box::new(TerminalPrompt)
        }
    }
}

/// Client for a `pinentry` program speaking the Assuan protocol on stdio
#[derive(Debug, Clone)]
pub struct Pinentry {
    program: PathBuf,
}

impl Pinentry {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PinPrompt for Pinentry {
    fn get_pin(&self, request: &PinRequest) -> Result<String, PromptError> {
        let spawn_error = |source| PromptError::Spawn {
            program: self.program.display().to_string(),
            source,
        };

        let mut child = Command::new(&self.program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_error)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(PromptError::Protocol(
                "pinentry stdio was not captured".to_string(),
            ));
        };

        let mut session = AssuanSession::new(BufReader::new(stdout), stdin);
        let result = session.get_pin(request);
        session.bye();
        drop(session);

        child.wait()?;
        result
    }
}

/// Line-oriented Assuan client state
struct AssuanSession<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> AssuanSession<R, W> {
    fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    fn get_pin(&mut self, request: &PinRequest) -> Result<String, PromptError> {
        self.read_response()?;
        self.command(&format!("SETPROMPT {}", escape(&request.prompt)))?;
        self.command(&format!("SETDESC {}", escape(&request.description)))?;

        let pin = self.command("GETPIN")?;
        let pin = pin.trim().to_string();
        if pin.is_empty() {
            return Err(PromptError::Cancelled);
        }
        Ok(pin)
    }

    fn bye(&mut self) {
        // pinentry may already have exited
        let _ = self.send("BYE");
    }

    fn send(&mut self, line: &str) -> Result<(), PromptError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn command(&mut self, line: &str) -> Result<String, PromptError> {
        self.send(line)?;
        self.read_response()
    }

    /// Read until `OK` or `ERR`, collecting `D` data lines
    fn read_response(&mut self) -> Result<String, PromptError> {
        let mut data = Vec::new();

        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Err(PromptError::Protocol(
                    "pinentry closed the connection".to_string(),
                ));
            }
            let line = line.trim_end_matches(['\r', '\n']);

            if line == "OK" || line.starts_with("OK ") {
                return String::from_utf8(data).map_err(|_| {
                    PromptError::Protocol("pinentry returned invalid UTF-8".to_string())
                });
            } else if let Some(rest) = line.strip_prefix("D ") {
                data.extend(unescape(rest)?);
            } else if let Some(rest) = line.strip_prefix("ERR ") {
                return Err(parse_error(rest));
            } else if line.starts_with('#') || line == "S" || line.starts_with("S ") {
                continue;
            } else {
                return Err(PromptError::Protocol(format!(
                    "unexpected pinentry response: {line}"
                )));
            }
        }
    }
}

fn parse_error(rest: &str) -> PromptError {
    let (code, message) = rest.split_once(' ').unwrap_or((rest, ""));
    let cancelled = code
        .parse::<u32>()
        .is_ok_and(|code| code & 0xFFFF == GPG_ERR_CANCELED)
        || message.to_ascii_lowercase().contains("cancel");

    if cancelled {
        PromptError::Cancelled
    } else {
        PromptError::Protocol(rest.to_string())
    }
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '\r' => escaped.push_str("%0D"),
            '\n' => escaped.push_str("%0A"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape(value: &str) -> Result<Vec<u8>, PromptError> {
    let bytes = value.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let byte = bytes
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .ok_or_else(|| PromptError::Protocol(format!("bad escape in data: {value}")))?;
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }

    Ok(decoded)
}

/// Terminal fallback; an empty answer counts as cancellation
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl PinPrompt for TerminalPrompt {
    fn get_pin(&self, request: &PinRequest) -> Result<String, PromptError> {
        eprintln!("{}", request.description);

        let answer = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(&request.prompt)
            .allow_empty(true)
            .validate_with(|input: &String| {
                if input.chars().all(|c| c.is_ascii_digit()) {
                    Ok(())
                } else {
                    Err("MFA code must be numeric")
                }
            })
            .interact_text()
            .map_err(terminal_error)?;

        let answer = answer.trim().to_string();
        if answer.is_empty() {
            return Err(PromptError::Cancelled);
        }
        Ok(answer)
    }
}

/// Ctrl-C at the terminal prompt surfaces as `Interrupted`
fn terminal_error(e: dialoguer::Error) -> PromptError {
    let dialoguer::Error::IO(e) = e;
    match e.kind() {
        ErrorKind::Interrupted => PromptError::Cancelled,
        _ => PromptError::Io(e),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Prompt double that replays a fixed answer and records requests
    pub struct FakePrompt {
        answer: Option<&'static str>,
        cancel: bool,
        pub requests: RefCell<Vec<PinRequest>>,
    }

    impl FakePrompt {
        pub fn answering(code: &'static str) -> Self {
            Self {
                answer: Some(code),
                cancel: false,
                requests: RefCell::new(Vec::new()),
            }
        }

        pub fn cancelling() -> Self {
            Self {
                answer: None,
                cancel: true,
                requests: RefCell::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                answer: None,
                cancel: false,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl PinPrompt for FakePrompt {
        fn get_pin(&self, request: &PinRequest) -> Result<String, PromptError> {
            self.requests.borrow_mut().push(request.clone());
            match (self.answer, self.cancel) {
                (Some(code), _) => Ok(code.to_string()),
                (None, true) => Err(PromptError::Cancelled),
                (None, false) => Err(PromptError::Protocol("no tty".to_string())),
            }
        }
    }
}
