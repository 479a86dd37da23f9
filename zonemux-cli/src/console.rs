//! Console command parsing
//!
//! One command per line, whitespace separated. Zones and sources are numbered
//! from 0 as on the board.

use preamp_regs::InputType;
use thiserror::Error;

/// Help text printed by `help`
pub const HELP: &str = "\
commands:
  vol <zone> <0-79>          set attenuation (0 is loudest)
  mute <zone>                mute a zone
  unmute <zone>              unmute a zone
  src <zone> <source>        route a source to a zone
  input <source> <a|d>       select analog or digital input
  standby                    silence every zone
  wake                       leave standby
  status [zone]              show preamp or zone state
  verify                     compare hardware with controller state
  init                       reset every zone and source
  help                       show this text
  quit                       exit";

/// A parsed console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Volume { zone: usize, volume: u8 },
    Mute { zone: usize, mute: bool },
    Source { zone: usize, source: usize },
    Input { source: usize, input_type: InputType },
    Standby(bool),
    Status(Option<usize>),
    Verify,
    Init,
    Help,
    Quit,
}

/// Why a line could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}' (try 'help')")]
    UnknownCommand(String),

    #[error("missing <{0}>")]
    MissingArgument(&'static str),

    #[error("invalid <{name}>: '{value}'")]
    InvalidArgument { name: &'static str, value: String },

    #[error("unexpected '{0}'")]
    TrailingInput(String),
}

fn arg<'a, T: std::str::FromStr>(
    words: &mut impl Iterator<Item = &'a str>,
    name: &'static str,
) -> Result<T, ParseError> {
    let word = words.next().ok_or(ParseError::MissingArgument(name))?;
    word.parse().map_err(|_| ParseError::InvalidArgument {
        name,
        value: word.to_string(),
    })
}

/// Parse one console line
pub fn parse(line: &str) -> Result<ConsoleCommand, ParseError> {
    let mut words = line.split_whitespace();
    let cmd = words.next().ok_or(ParseError::Empty)?;

    let parsed = match cmd.to_ascii_lowercase().as_str() {
        "vol" | "volume" => ConsoleCommand::Volume {
            zone: arg(&mut words, "zone")?,
            volume: arg(&mut words, "volume")?,
        },
        "mute" => ConsoleCommand::Mute {
            zone: arg(&mut words, "zone")?,
            mute: true,
        },
        "unmute" => ConsoleCommand::Mute {
            zone: arg(&mut words, "zone")?,
            mute: false,
        },
        "src" | "source" => ConsoleCommand::Source {
            zone: arg(&mut words, "zone")?,
            source: arg(&mut words, "source")?,
        },
        "input" => ConsoleCommand::Input {
            source: arg(&mut words, "source")?,
            input_type: arg(&mut words, "input type")?,
        },
        "standby" => ConsoleCommand::Standby(true),
        "wake" => ConsoleCommand::Standby(false),
        "status" | "st" => ConsoleCommand::Status(match words.next() {
            Some(word) => Some(word.parse().map_err(|_| ParseError::InvalidArgument {
                name: "zone",
                value: word.to_string(),
            })?),
            None => None,
        }),
        "verify" => ConsoleCommand::Verify,
        "init" => ConsoleCommand::Init,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        _ => return Err(ParseError::UnknownCommand(cmd.to_string())),
    };

    let rest: Vec<&str> = words.collect();
    if !rest.is_empty() {
        return Err(ParseError::TrailingInput(rest.join(" ")));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_commands() {
        assert_eq!(
            parse("vol 2 30"),
            Ok(ConsoleCommand::Volume { zone: 2, volume: 30 })
        );
        assert_eq!(
            parse("  UNMUTE 4 "),
            Ok(ConsoleCommand::Mute {
                zone: 4,
                mute: false
            })
        );
        assert_eq!(
            parse("src 0 3"),
            Ok(ConsoleCommand::Source { zone: 0, source: 3 })
        );
        assert_eq!(
            parse("input 1 d"),
            Ok(ConsoleCommand::Input {
                source: 1,
                input_type: InputType::Digital
            })
        );
        assert_eq!(parse("standby"), Ok(ConsoleCommand::Standby(true)));
        assert_eq!(parse("wake"), Ok(ConsoleCommand::Standby(false)));
        assert_eq!(parse("status"), Ok(ConsoleCommand::Status(None)));
        assert_eq!(parse("status 5"), Ok(ConsoleCommand::Status(Some(5))));
        assert_eq!(parse("q"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_range_is_left_to_the_controller() {
        // Parsed here, rejected by the preamp
        assert_eq!(
            parse("vol 9 200"),
            Ok(ConsoleCommand::Volume {
                zone: 9,
                volume: 200
            })
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse("   "), Err(ParseError::Empty));
        assert_eq!(
            parse("louder"),
            Err(ParseError::UnknownCommand("louder".into()))
        );
        assert_eq!(parse("vol 1"), Err(ParseError::MissingArgument("volume")));
        assert_eq!(
            parse("vol one 3"),
            Err(ParseError::InvalidArgument {
                name: "zone",
                value: "one".into()
            })
        );
        assert_eq!(
            parse("vol 1 300"),
            Err(ParseError::InvalidArgument {
                name: "volume",
                value: "300".into()
            })
        );
        assert_eq!(
            parse("standby now"),
            Err(ParseError::TrailingInput("now".into()))
        );
        assert_eq!(
            parse("input 0 optical"),
            Err(ParseError::InvalidArgument {
                name: "input type",
                value: "optical".into()
            })
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            parse("louder").unwrap_err().to_string(),
            "unknown command 'louder' (try 'help')"
        );
        assert_eq!(
            parse("vol 1").unwrap_err().to_string(),
            "missing <volume>"
        );
        assert_eq!(
            parse("src x 1").unwrap_err().to_string(),
            "invalid <zone>: 'x'"
        );
        assert_eq!(
            parse("wake up").unwrap_err().to_string(),
            "unexpected 'up'"
        );
    }

    proptest! {
        #[test]
        fn parse_never_panics(line in "\\PC*") {
            let _ = parse(&line);
        }

        #[test]
        fn volume_arguments_round_trip(zone in 0usize..100, volume: u8) {
            prop_assert_eq!(
                parse(&format!("vol {zone} {volume}")),
                Ok(ConsoleCommand::Volume { zone, volume })
            );
        }
    }
}
