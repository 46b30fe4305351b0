//! Request lines sent by clients.

use crate::error::ProtocolError;
use std::fmt;

/// Client operations, one per command keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    // Session management
    Hello,
    Ping,
    Leave,

    // Chat
    Help,
    Speak,
    ListMembers,

    // Auctions
    Create,
    ListAuctions,
    Bid,
}

impl Operation {
    /// Resolves a case-sensitive command keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let op = match keyword {
            "HELLO" => Operation::Hello,
            "PING" => Operation::Ping,
            "LEAVE" => Operation::Leave,
            "HELP" => Operation::Help,
            "SPEAK" => Operation::Speak,
            "LSMEM" => Operation::ListMembers,
            "CREAT" => Operation::Create,
            "LSAUC" => Operation::ListAuctions,
            "BID" => Operation::Bid,
            _ => return None,
        };
        Some(op)
    }

    /// Returns the wire keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            Operation::Hello => "HELLO",
            Operation::Ping => "PING",
            Operation::Leave => "LEAVE",
            Operation::Help => "HELP",
            Operation::Speak => "SPEAK",
            Operation::ListMembers => "LSMEM",
            Operation::Create => "CREAT",
            Operation::ListAuctions => "LSAUC",
            Operation::Bid => "BID",
        }
    }

    /// Returns whether the operation is allowed before HELLO succeeds.
    pub fn allowed_unauthenticated(&self) -> bool {
        matches!(self, Operation::Hello | Operation::Ping)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A parsed request line: the operation plus everything after the keyword.
///
/// Arguments are kept raw; each handler validates its own arity and types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub op: Operation,
    rest: String,
}

impl Request {
    pub fn new(op: Operation, rest: impl Into<String>) -> Self {
        Self {
            op,
            rest: rest.into(),
        }
    }

    /// Parses a decoded line.
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ProtocolError::EmptyLine);
        }

        let (keyword, rest) = match line.find(char::is_whitespace) {
            Some(pos) => (&line[..pos], line[pos..].trim_start()),
            None => (line, ""),
        };

        let op = Operation::from_keyword(keyword)
            .ok_or_else(|| ProtocolError::UnknownCommand(keyword.to_string()))?;

        Ok(Self::new(op, rest))
    }

    /// Whitespace-separated arguments.
    pub fn args(&self) -> Vec<&str> {
        self.rest.split_whitespace().collect()
    }

    /// The raw text after the keyword, as used by SPEAK.
    pub fn text(&self) -> &str {
        &self.rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keyword_only() {
        let request = Request::parse("LSMEM").unwrap();
        assert_eq!(request.op, Operation::ListMembers);
        assert!(request.args().is_empty());
    }

    #[test]
    fn test_parse_arguments() {
        let request = Request::parse("CREAT item1 100 10 5").unwrap();
        assert_eq!(request.op, Operation::Create);
        assert_eq!(request.args(), vec!["item1", "100", "10", "5"]);
    }

    #[test]
    fn test_speak_keeps_inner_spacing() {
        let request = Request::parse("SPEAK  hello   there ").unwrap();
        assert_eq!(request.op, Operation::Speak);
        assert_eq!(request.text(), "hello   there");
    }

    #[test]
    fn test_keywords_are_case_sensitive() {
        assert_eq!(
            Request::parse("hello bob pw"),
            Err(ProtocolError::UnknownCommand("hello".to_string()))
        );
        assert_eq!(
            Request::parse("ENTER 1"),
            Err(ProtocolError::UnknownCommand("ENTER".to_string()))
        );
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(Request::parse("   "), Err(ProtocolError::EmptyLine));
    }

    #[test]
    fn test_keyword_roundtrip() {
        for op in [
            Operation::Hello,
            Operation::Ping,
            Operation::Leave,
            Operation::Help,
            Operation::Speak,
            Operation::ListMembers,
            Operation::Create,
            Operation::ListAuctions,
            Operation::Bid,
        ] {
            assert_eq!(Operation::from_keyword(op.keyword()), Some(op));
        }
    }

    #[test]
    fn test_unauthenticated_operations() {
        assert!(Operation::Hello.allowed_unauthenticated());
        assert!(Operation::Ping.allowed_unauthenticated());
        assert!(!Operation::Speak.allowed_unauthenticated());
        assert!(!Operation::Leave.allowed_unauthenticated());
    }
}
