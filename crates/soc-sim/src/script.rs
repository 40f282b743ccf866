//! Line-oriented bus scripts.
//!
//! ```text
//! # stage address 0x1000 and write 0x12345678
//! write 0xFE24 0x00
//! write 0xFE25 0x10
//! write 0xFE20 0x78
//! write 0xFE21 0x56
//! write 0xFE22 0x34
//! write 0xFE23 0x12
//! hold
//! ```
//!
//! Numbers are decimal, `0x`-prefixed hex, or `$`-prefixed hex.

use thiserror::Error;

/// One script instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Present a write cycle.
    Write {
        /// Bus address.
        address: u16,
        /// Byte written.
        data: u8,
    },
    /// Present a read cycle.
    Read {
        /// Bus address.
        address: u16,
    },
    /// Repeat the previous cycle until `ready` is asserted.
    Hold,
    /// Repeat the previous cycle a fixed number of times.
    Idle(u32),
    /// Compare the data returned for the last cycle.
    Expect(u8),
    /// Preload a word into the upstream memory.
    Upstream {
        /// Upstream address.
        address: u32,
        /// Word stored.
        word: u32,
    },
    /// Pulse the external reset input.
    Reset,
}

/// A command with its 1-based source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement {
    /// Source line number.
    pub line: usize,
    /// Parsed command.
    pub command: Command,
}

/// Malformed script input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// First word is not a known command.
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand {
        /// Source line number.
        line: usize,
        /// Word as written.
        command: String,
    },
    /// Wrong number of operands.
    #[error("line {line}: `{command}` takes {expected} operand(s), found {found}")]
    Arity {
        /// Source line number.
        line: usize,
        /// Command name.
        command: &'static str,
        /// Operands required.
        expected: usize,
        /// Operands present.
        found: usize,
    },
    /// Operand is not a number.
    #[error("line {line}: invalid number `{text}`")]
    InvalidNumber {
        /// Source line number.
        line: usize,
        /// Operand as written.
        text: String,
    },
    /// Operand does not fit its field.
    #[error("line {line}: {value:#X} does not fit in {bits} bits")]
    OutOfRange {
        /// Source line number.
        line: usize,
        /// Parsed value.
        value: u64,
        /// Field width.
        bits: u32,
    },
}

/// Parses a whole script, skipping blank lines and `#` comments.
///
/// # Errors
///
/// Returns the first [`ScriptError`] found, tagged with its line number.
pub fn parse_script(source: &str) -> Result<Vec<Statement>, ScriptError> {
    let mut statements = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let text = raw.split_once('#').map_or(raw, |(code, _)| code);
        let words: Vec<&str> = text.split_whitespace().collect();
        let Some((&name, operands)) = words.split_first() else {
            continue;
        };
        let command = parse_command(line, name, operands)?;
        statements.push(Statement { line, command });
    }
    Ok(statements)
}

fn parse_command(line: usize, name: &str, operands: &[&str]) -> Result<Command, ScriptError> {
    let operand = Operands { line, operands };
    let command = match name.to_ascii_lowercase().as_str() {
        "write" => {
            operand.require("write", 2)?;
            Command::Write {
                address: operand.narrow(0, 16)?,
                data: operand.narrow(1, 8)?,
            }
        }
        "read" => {
            operand.require("read", 1)?;
            Command::Read {
                address: operand.narrow(0, 16)?,
            }
        }
        "hold" => {
            operand.require("hold", 0)?;
            Command::Hold
        }
        "idle" => {
            operand.require("idle", 1)?;
            Command::Idle(operand.narrow(0, 32)?)
        }
        "expect" => {
            operand.require("expect", 1)?;
            Command::Expect(operand.narrow(0, 8)?)
        }
        "upstream" => {
            operand.require("upstream", 2)?;
            Command::Upstream {
                address: operand.narrow(0, 32)?,
                word: operand.narrow(1, 32)?,
            }
        }
        "reset" => {
            operand.require("reset", 0)?;
            Command::Reset
        }
        _ => {
            return Err(ScriptError::UnknownCommand {
                line,
                command: name.to_string(),
            });
        }
    };
    Ok(command)
}

struct Operands<'a> {
    line: usize,
    operands: &'a [&'a str],
}

impl Operands<'_> {
    const fn require(&self, command: &'static str, expected: usize) -> Result<(), ScriptError> {
        if self.operands.len() == expected {
            Ok(())
        } else {
            Err(ScriptError::Arity {
                line: self.line,
                command,
                expected,
                found: self.operands.len(),
            })
        }
    }

    fn narrow<T: TryFrom<u64>>(&self, index: usize, bits: u32) -> Result<T, ScriptError> {
        let text = self.operands[index];
        let value = parse_number(text).ok_or_else(|| ScriptError::InvalidNumber {
            line: self.line,
            text: text.to_string(),
        })?;
        T::try_from(value).map_err(|_| ScriptError::OutOfRange {
            line: self.line,
            value,
            bits,
        })
    }
}

fn parse_number(text: &str) -> Option<u64> {
    let text = text.replace('_', "");
    if let Some(hex) = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix('$'))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}
