use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::unit::{Color, OwnerId};

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("failed to read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// One operation of a simulation script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `init <memory> <frame> <os>` (paging) or `init <memory> <os>` (segmentation)
    Init {
        memory_size: usize,
        frame_size: Option<usize>,
        os_size: usize,
    },
    Add {
        name: String,
        size: usize,
        color: Option<Color>,
    },
    Delete { name: String },
    Remove { sid: OwnerId },
    Translate { id: OwnerId, offset: usize },
    Show,
    Stats,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Init { memory_size, frame_size: Some(frame), os_size } => {
                write!(f, "init {} {} {}", memory_size, frame, os_size)
            }
            Command::Init { memory_size, frame_size: None, os_size } => {
                write!(f, "init {} {}", memory_size, os_size)
            }
            Command::Add { name, size, color: Some(color) } => write!(f, "add {} {} {}", name, size, color),
            Command::Add { name, size, color: None } => write!(f, "add {} {}", name, size),
            Command::Delete { name } => write!(f, "delete {}", name),
            Command::Remove { sid } => write!(f, "remove {}", sid),
            Command::Translate { id, offset } => write!(f, "translate {} {}", id, offset),
            Command::Show => write!(f, "show"),
            Command::Stats => write!(f, "stats"),
        }
    }
}

fn parse_field<T: FromStr>(token: &str, what: &str) -> Result<T, String> {
    token.parse().map_err(|_| format!("Invalid {}: {}", what, token))
}

fn expect_args(keyword: &str, args: &[&str], allowed: &[usize]) -> Result<(), String> {
    if allowed.contains(&args.len()) {
        Ok(())
    } else {
        Err(format!("'{}' takes {:?} argument(s), got {}", keyword, allowed, args.len()))
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some((&keyword, args)) = tokens.split_first() else {
            return Err("Empty command".to_string());
        };

        match keyword.to_lowercase().as_str() {
            "init" => {
                expect_args(keyword, args, &[2, 3])?;
                let memory_size = parse_field(args[0], "memory size")?;
                if args.len() == 3 {
                    Ok(Command::Init {
                        memory_size,
                        frame_size: Some(parse_field(args[1], "frame size")?),
                        os_size: parse_field(args[2], "OS size")?,
                    })
                } else {
                    Ok(Command::Init {
                        memory_size,
                        frame_size: None,
                        os_size: parse_field(args[1], "OS size")?,
                    })
                }
            }
            "add" => {
                expect_args(keyword, args, &[2, 3])?;
                let color = match args.get(2) {
                    Some(token) => Some(token.parse::<Color>()?),
                    None => None,
                };
                Ok(Command::Add {
                    name: args[0].to_string(),
                    size: parse_field(args[1], "size")?,
                    color,
                })
            }
            "delete" => {
                expect_args(keyword, args, &[1])?;
                Ok(Command::Delete { name: args[0].to_string() })
            }
            "remove" => {
                expect_args(keyword, args, &[1])?;
                Ok(Command::Remove { sid: args[0].parse()? })
            }
            "translate" => {
                expect_args(keyword, args, &[2])?;
                Ok(Command::Translate {
                    id: args[0].parse()?,
                    offset: parse_field(args[1], "offset")?,
                })
            }
            "show" => {
                expect_args(keyword, args, &[0])?;
                Ok(Command::Show)
            }
            "stats" => {
                expect_args(keyword, args, &[0])?;
                Ok(Command::Stats)
            }
            _ => Err(format!("Unknown command: {}", keyword)),
        }
    }
}

/// A parsed script, commands paired with their 1-based line numbers
#[derive(Debug, Default)]
pub struct Script {
    pub commands: Vec<(usize, Command)>,
}

impl Script {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScriptError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ScriptError> {
        let mut commands = Vec::new();
        for (index, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let command = line.parse().map_err(|message| ScriptError::Syntax {
                line: index + 1,
                message,
            })?;
            commands.push((index + 1, command));
        }
        Ok(Script { commands })
    }
}

pub fn write_results<P: AsRef<Path>>(path: P, results: &[i64]) -> std::io::Result<()> {
    let output: Vec<String> = results.iter().map(|r| r.to_string()).collect();
    fs::write(path.as_ref(), output.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_script() {
        let script = Script::parse(
            "# paging walkthrough\n\
             init 16 4 4\n\
             add P1 5 #ff0000\n\
             \n\
             # P2 gets a random color\n\
             add P2 3\n\
             translate 0 4\n\
             translate os 1\n\
             delete p1\n\
             show\n\
             stats\n",
        )
        .unwrap();

        let commands: Vec<&Command> = script.commands.iter().map(|(_, c)| c).collect();
        assert_eq!(
            commands,
            vec![
                &Command::Init { memory_size: 16, frame_size: Some(4), os_size: 4 },
                &Command::Add { name: "P1".into(), size: 5, color: Some(Color::rgb(255, 0, 0)) },
                &Command::Add { name: "P2".into(), size: 3, color: None },
                &Command::Translate { id: OwnerId::User(0), offset: 4 },
                &Command::Translate { id: OwnerId::System, offset: 1 },
                &Command::Delete { name: "p1".into() },
                &Command::Show,
                &Command::Stats,
            ]
        );
        assert_eq!(script.commands[0].0, 2);
        assert_eq!(script.commands[2].0, 6);
    }

    #[test]
    fn test_parse_color_argument() {
        let command: Command = "add Heap 6 00ff80".parse().unwrap();
        assert_eq!(
            command,
            Command::Add { name: "Heap".into(), size: 6, color: Some(Color::rgb(0, 255, 128)) }
        );
    }

    #[test]
    fn test_parse_segmentation_commands() {
        assert_eq!(
            "init 20 4".parse::<Command>(),
            Ok(Command::Init { memory_size: 20, frame_size: None, os_size: 4 })
        );
        assert_eq!("remove 3".parse::<Command>(), Ok(Command::Remove { sid: OwnerId::User(3) }));
        assert_eq!("REMOVE OS".parse::<Command>(), Ok(Command::Remove { sid: OwnerId::System }));
    }

    #[test]
    fn test_parse_errors() {
        assert!("translate 0 -1".parse::<Command>().is_err());
        assert!("add P1 five".parse::<Command>().is_err());
        assert!("add P1".parse::<Command>().is_err());
        assert!("show me".parse::<Command>().is_err());
        assert!("jump 3".parse::<Command>().is_err());
        assert!("add P1 4 not-a-color".parse::<Command>().is_err());
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let err = Script::parse("init 16 4 4\n\nadd P1 x\n").unwrap_err();
        match err {
            ScriptError::Syntax { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("Invalid size"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_display_matches_input() {
        for text in ["init 16 4 4", "init 20 4", "add P1 5", "add P1 5 #ff0000", "delete P1", "remove 2", "translate OS 3", "show", "stats"] {
            let command: Command = text.parse().unwrap();
            assert_eq!(command.to_string(), text);
        }
    }

    #[test]
    fn test_write_results() {
        let path = std::env::temp_dir().join(format!("mem_alloc_results_{}.txt", std::process::id()));
        write_results(&path, &[4608, 5047, -1]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "4608 5047 -1");
        fs::remove_file(&path).unwrap();
    }
}
