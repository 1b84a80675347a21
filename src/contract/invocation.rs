//! Invocation definitions
//!
//! A transaction request as the runtime delivers it: a function name and
//! positional string arguments.

use std::fmt;

use crate::error::{LedgerError, Result};

/// Contract functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    CreateReading,
    GetReading,
    QueryDevice,
    LatestReading,
    DeleteReading,
}

impl Function {
    pub const ALL: [Function; 5] = [
        Function::CreateReading,
        Function::GetReading,
        Function::QueryDevice,
        Function::LatestReading,
        Function::DeleteReading,
    ];

    /// Name used on the wire
    pub fn name(self) -> &'static str {
        match self {
            Function::CreateReading => "CreateReading",
            Function::GetReading => "GetReading",
            Function::QueryDevice => "QueryDevice",
            Function::LatestReading => "LatestReading",
            Function::DeleteReading => "DeleteReading",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Number of string arguments the function takes
    pub fn arity(self) -> usize {
        match self {
            Function::CreateReading => 3,
            Function::GetReading | Function::DeleteReading => 2,
            Function::QueryDevice | Function::LatestReading => 1,
        }
    }

    /// Read-only functions are evaluated and never committed
    pub fn is_read_only(self) -> bool {
        matches!(
            self,
            Function::GetReading | Function::QueryDevice | Function::LatestReading
        )
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Store a payload under (uuid, timestamp)
    CreateReading {
        uuid: String,
        timestamp: u64,
        payload: Vec<u8>,
    },

    /// Fetch one reading
    GetReading { uuid: String, timestamp: u64 },

    /// Fetch every reading of a device
    QueryDevice { uuid: String },

    /// Fetch the newest reading of a device
    LatestReading { uuid: String },

    /// Remove one reading
    DeleteReading { uuid: String, timestamp: u64 },
}

impl Invocation {
    /// Parse a function name and its string arguments
    ///
    /// Timestamps arrive as decimal strings.
    pub fn parse<S: AsRef<str>>(function: &str, args: &[S]) -> Result<Self> {
        let func = Function::from_name(function).ok_or_else(|| {
            LedgerError::InvalidArgument(format!("unknown function {:?}", function))
        })?;

        if args.len() != func.arity() {
            return Err(LedgerError::InvalidArgument(format!(
                "{} takes {} argument(s), got {}",
                func,
                func.arity(),
                args.len()
            )));
        }

        let arg = |i: usize| args[i].as_ref();
        let invocation = match func {
            Function::CreateReading => Invocation::CreateReading {
                uuid: arg(0).to_string(),
                timestamp: parse_timestamp(arg(1))?,
                payload: arg(2).as_bytes().to_vec(),
            },
            Function::GetReading => Invocation::GetReading {
                uuid: arg(0).to_string(),
                timestamp: parse_timestamp(arg(1))?,
            },
            Function::QueryDevice => Invocation::QueryDevice {
                uuid: arg(0).to_string(),
            },
            Function::LatestReading => Invocation::LatestReading {
                uuid: arg(0).to_string(),
            },
            Function::DeleteReading => Invocation::DeleteReading {
                uuid: arg(0).to_string(),
                timestamp: parse_timestamp(arg(1))?,
            },
        };

        Ok(invocation)
    }

    /// Get the function this invocation calls
    pub fn function(&self) -> Function {
        match self {
            Invocation::CreateReading { .. } => Function::CreateReading,
            Invocation::GetReading { .. } => Function::GetReading,
            Invocation::QueryDevice { .. } => Function::QueryDevice,
            Invocation::LatestReading { .. } => Function::LatestReading,
            Invocation::DeleteReading { .. } => Function::DeleteReading,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.function().is_read_only()
    }
}

fn parse_timestamp(arg: &str) -> Result<u64> {
    arg.parse::<u64>().map_err(|e| {
        LedgerError::InvalidArgument(format!("timestamp {:?} is not a u64: {}", arg, e))
    })
}
