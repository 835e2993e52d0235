//! Instruction records and their whitespace-separated text form.
//!
//! ```text
//!   P S B          header: processes, region bytes, objects
//!   0 p            connect
//!   1 p            disconnect
//!   2 p b          read object b
//!   3 p b s        allocate s words as object b
//!   4 p b          free object b
//! ```
//!
//! Line breaks carry no meaning; records are read token by token.

use std::{fmt, str::SplitAsciiWhitespace};

use crate::error::{OracleError, Result};

const CONNECT: usize = 0;
const DISCONNECT: usize = 1;
const READ: usize = 2;
const ALLOCATE: usize = 3;
const FREE: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamHeader {
  pub processes: usize,
  pub region_bytes: usize,
  pub objects: usize,
}

impl fmt::Display for StreamHeader {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{} {} {}", self.processes, self.region_bytes, self.objects)
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
  Connect { pid: usize },
  Disconnect { pid: usize },
  Read { pid: usize, handle: usize },
  Allocate { pid: usize, handle: usize, size: usize },
  Free { pid: usize, handle: usize },
}

impl Instruction {
  /// Process issuing the instruction.
  pub fn pid(&self) -> usize {
    match *self {
      Self::Connect { pid }
      | Self::Disconnect { pid }
      | Self::Read { pid, .. }
      | Self::Allocate { pid, .. }
      | Self::Free { pid, .. } => pid,
    }
  }

  /// Object handle the instruction touches, if any.
  pub fn handle(&self) -> Option<usize> {
    match *self {
      Self::Connect { .. } | Self::Disconnect { .. } => None,
      Self::Read { handle, .. } | Self::Allocate { handle, .. } | Self::Free { handle, .. } => {
        Some(handle)
      }
    }
  }

  pub fn code(&self) -> usize {
    match self {
      Self::Connect { .. } => CONNECT,
      Self::Disconnect { .. } => DISCONNECT,
      Self::Read { .. } => READ,
      Self::Allocate { .. } => ALLOCATE,
      Self::Free { .. } => FREE,
    }
  }
}

impl fmt::Display for Instruction {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(f, "{} {}", self.code(), self.pid())?;

    if let Some(handle) = self.handle() {
      write!(f, " {handle}")?;
    }
    if let Self::Allocate { size, .. } = self {
      write!(f, " {size}")?;
    }

    Ok(())
  }
}

/// Token-level reader over an instruction stream.
pub struct Parser<'a> {
  tokens: SplitAsciiWhitespace<'a>,
  position: usize,
}

impl<'a> Parser<'a> {
  pub fn new(input: &'a str) -> Self {
    Self {
      tokens: input.split_ascii_whitespace(),
      position: 0,
    }
  }

  fn token(&mut self) -> Option<(usize, &'a str)> {
    let token = self.tokens.next()?;
    self.position += 1;
    Some((self.position, token))
  }

  fn number(
    &mut self,
    what: &str,
  ) -> Result<usize> {
    let (position, token) = self.token().ok_or_else(|| OracleError::Parse {
      token: self.position + 1,
      cause: format!("missing {what}"),
    })?;

    parse_number(position, token, what)
  }

  /// Reads the `P S B` header.
  pub fn header(&mut self) -> Result<StreamHeader> {
    Ok(StreamHeader {
      processes: self.number("process count")?,
      region_bytes: self.number("region size")?,
      objects: self.number("object count")?,
    })
  }

  fn instruction(
    &mut self,
    position: usize,
    code: &str,
  ) -> Result<Instruction> {
    let instruction = match parse_number(position, code, "instruction code")? {
      CONNECT => Instruction::Connect {
        pid: self.number("process")?,
      },
      DISCONNECT => Instruction::Disconnect {
        pid: self.number("process")?,
      },
      READ => Instruction::Read {
        pid: self.number("process")?,
        handle: self.number("object")?,
      },
      ALLOCATE => Instruction::Allocate {
        pid: self.number("process")?,
        handle: self.number("object")?,
        size: self.number("size")?,
      },
      FREE => Instruction::Free {
        pid: self.number("process")?,
        handle: self.number("object")?,
      },
      other => {
        return Err(OracleError::Parse {
          token: position,
          cause: format!("unknown instruction code {other}"),
        });
      }
    };

    Ok(instruction)
  }
}

impl Iterator for Parser<'_> {
  type Item = Result<Instruction>;

  fn next(&mut self) -> Option<Self::Item> {
    let (position, code) = self.token()?;
    Some(self.instruction(position, code))
  }
}

fn parse_number(
  position: usize,
  token: &str,
  what: &str,
) -> Result<usize> {
  token.parse().map_err(|err| OracleError::Parse {
    token: position,
    cause: format!("bad {what} {token:?}: {err}"),
  })
}

/// Parses a whole stream: header followed by every instruction.
pub fn parse_stream(input: &str) -> Result<(StreamHeader, Vec<Instruction>)> {
  let mut parser = Parser::new(input);
  let header = parser.header()?;
  let instructions = parser.collect::<Result<Vec<_>>>()?;

  Ok((header, instructions))
}
