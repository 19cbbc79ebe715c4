//! Line command parsing
//!
//! One command per input line. Paragraph and option numbers are 1-based as
//! shown on screen.

use companion_core::{Section, StudyEvent};

/// What a line asks for
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show the original text
    Read,
    /// Show translations and annotations
    Analysis,
    /// Show the tutor conversation
    Chat,
    /// Show the current quiz question
    Quiz,
    /// List commands
    Help,
    /// Forward to the engine
    Event(StudyEvent),
}

impl Command {
    /// View a local command switches to, if any
    pub fn section(&self) -> Option<Section> {
        match self {
            Self::Read => Some(Section::Reading),
            Self::Analysis => Some(Section::Analysis),
            Self::Chat => Some(Section::Tutor),
            Self::Quiz => Some(Section::Quiz),
            Self::Help | Self::Event(_) => None,
        }
    }
}

/// Why a line could not be parsed
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Blank line
    #[error("empty command")]
    Empty,

    /// First word is not a command
    #[error("unknown command `{0}`, type `help` for a list")]
    Unknown(String),

    /// A required argument is missing
    #[error("`{command}` needs {what}")]
    MissingArgument {
        /// Command name
        command: &'static str,
        /// Description of the argument
        what: &'static str,
    },

    /// A numeric argument was not a positive integer
    #[error("`{0}` is not a positive number")]
    InvalidNumber(String),
}

/// Help text listing every command
pub const HELP: &str = "\
commands:
  read            show the original text
  analysis        show translations and annotations
  explain <n>     explain paragraph n
  dismiss         close the explanation
  speak <n>       narrate paragraph n
  stop            stop narration
  ask <text>      ask the tutor
  chat            show the conversation
  reset-chat      start a new conversation
  quiz            show the current question
  answer <n>      choose option n
  next            next question
  reset-quiz      restart the quiz
  help            this list
  quit            leave";

fn positive(arg: Option<&str>, command: &'static str, what: &'static str) -> Result<usize, ParseError> {
    let arg = arg.ok_or(ParseError::MissingArgument { command, what })?;
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ParseError::InvalidNumber(arg.to_string())),
    }
}

fn paragraph(arg: Option<&str>, command: &'static str) -> Result<u32, ParseError> {
    let n = positive(arg, command, "a paragraph number")?;
    u32::try_from(n).map_err(|_| ParseError::InvalidNumber(n.to_string()))
}

/// Parse one input line
pub fn parse(line: &str) -> Result<Command, ParseError> {
    let line = line.trim();
    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then_some(rest);

    let command = match name.to_lowercase().as_str() {
        "" => return Err(ParseError::Empty),
        "read" => Command::Read,
        "analysis" => Command::Analysis,
        "chat" => Command::Chat,
        "quiz" => Command::Quiz,
        "help" | "?" => Command::Help,
        "explain" => Command::Event(StudyEvent::Explain {
            paragraph_id: paragraph(arg, "explain")?,
        }),
        "dismiss" => Command::Event(StudyEvent::DismissExplanation),
        "speak" => Command::Event(StudyEvent::Speak {
            paragraph_id: paragraph(arg, "speak")?,
        }),
        "stop" => Command::Event(StudyEvent::StopSpeech),
        "ask" => {
            let text = arg.ok_or(ParseError::MissingArgument {
                command: "ask",
                what: "a question",
            })?;
            Command::Event(StudyEvent::SendChat {
                text: text.to_string(),
            })
        }
        "reset-chat" => Command::Event(StudyEvent::ResetChat),
        "answer" => Command::Event(StudyEvent::SelectOption {
            index: positive(arg, "answer", "an option number")? - 1,
        }),
        "next" => Command::Event(StudyEvent::NextQuestion),
        "reset-quiz" => Command::Event(StudyEvent::ResetQuiz),
        "quit" | "exit" => Command::Event(StudyEvent::Quit),
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(command)
}
