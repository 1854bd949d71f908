//! FTP reply representation and classification

use log::debug;
use std::fmt;

/// Three-digit reply code.
///
/// Only codes whose first digit is 1-5 and whose second digit is 0-5 can be
/// constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyCode([u8; 3]);

impl ReplyCode {
    pub fn parse(code: &str) -> Option<Self> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 {
            return None;
        }
        if !(b'1'..=b'5').contains(&bytes[0]) || !(b'0'..=b'5').contains(&bytes[1]) {
            return None;
        }
        Some(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("")
    }

    /// Numeric value; a non-digit third character counts as 0
    pub fn value(&self) -> u16 {
        let third = if self.0[2].is_ascii_digit() {
            self.0[2] - b'0'
        } else {
            0
        };
        (self.0[0] - b'0') as u16 * 100 + (self.0[1] - b'0') as u16 * 10 + third as u16
    }

    pub fn is_positive(&self) -> bool {
        self.is_positive_preliminary()
            || self.is_positive_completion()
            || self.is_positive_intermediate()
    }

    pub fn is_negative(&self) -> bool {
        self.is_transient_negative() || self.is_permanent_negative()
    }

    pub fn is_positive_preliminary(&self) -> bool {
        self.0[0] == b'1'
    }

    pub fn is_positive_completion(&self) -> bool {
        self.0[0] == b'2'
    }

    pub fn is_positive_intermediate(&self) -> bool {
        self.0[0] == b'3'
    }

    pub fn is_transient_negative(&self) -> bool {
        self.0[0] == b'4'
    }

    pub fn is_permanent_negative(&self) -> bool {
        self.0[0] == b'5'
    }

    // Second digit: what the reply refers to

    pub fn is_syntax(&self) -> bool {
        self.0[1] == b'0'
    }

    pub fn is_information(&self) -> bool {
        self.0[1] == b'1'
    }

    pub fn is_connections(&self) -> bool {
        self.0[1] == b'2'
    }

    pub fn is_authentication(&self) -> bool {
        self.0[1] == b'3'
    }

    pub fn is_unspecified(&self) -> bool {
        self.0[1] == b'4'
    }

    pub fn is_file_system(&self) -> bool {
        self.0[1] == b'5'
    }
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server reply: full (possibly multi-line) text plus its code
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    text: String,
    code: Option<ReplyCode>,
}

impl Reply {
    pub fn new(text: impl Into<String>) -> Self {
        let mut reply = Self::default();
        reply.set(text);
        reply
    }

    /// Store `text` and read its code. Returns false (and leaves the code
    /// unset) if the text does not start with a valid code.
    pub fn set(&mut self, text: impl Into<String>) -> bool {
        self.text = text.into();
        self.code = self.text.get(..3).and_then(ReplyCode::parse);
        if self.code.is_none() {
            debug!("Reply without a valid code: '{}'", self.text);
        }
        self.code.is_some()
    }

    pub fn is_set(&self) -> bool {
        self.code.is_some()
    }

    pub fn code(&self) -> Option<ReplyCode> {
        self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text of the first line after the code and its separator
    pub fn message(&self) -> &str {
        let first_line = self.text.lines().next().unwrap_or("");
        first_line.get(4..).unwrap_or("").trim_end()
    }

    fn check(&self, predicate: fn(&ReplyCode) -> bool) -> bool {
        self.code.as_ref().is_some_and(predicate)
    }

    pub fn is_positive(&self) -> bool {
        self.check(ReplyCode::is_positive)
    }

    pub fn is_negative(&self) -> bool {
        self.check(ReplyCode::is_negative)
    }

    pub fn is_positive_preliminary(&self) -> bool {
        self.check(ReplyCode::is_positive_preliminary)
    }

    pub fn is_positive_completion(&self) -> bool {
        self.check(ReplyCode::is_positive_completion)
    }

    pub fn is_positive_intermediate(&self) -> bool {
        self.check(ReplyCode::is_positive_intermediate)
    }

    pub fn is_transient_negative(&self) -> bool {
        self.check(ReplyCode::is_transient_negative)
    }

    pub fn is_permanent_negative(&self) -> bool {
        self.check(ReplyCode::is_permanent_negative)
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Result of a simple command exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 2yz reply
    Ok,
    /// 4yz or 5yz reply
    NotOk,
    /// Anything else, including transport failures
    Error,
}

impl CommandOutcome {
    /// Standard classification: negative is `NotOk`, 2yz is `Ok`
    pub fn from_reply(reply: &Reply) -> Self {
        if reply.is_negative() {
            CommandOutcome::NotOk
        } else if reply.is_positive_completion() {
            CommandOutcome::Ok
        } else {
            CommandOutcome::Error
        }
    }

    pub fn is_ok(self) -> bool {
        self == CommandOutcome::Ok
    }
}

impl fmt::Display for CommandOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutcome::Ok => write!(f, "OK"),
            CommandOutcome::NotOk => write!(f, "NOT OK"),
            CommandOutcome::Error => write!(f, "ERROR"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn primary_flags(reply: &Reply) -> [bool; 5] {
        [
            reply.is_positive_preliminary(),
            reply.is_positive_completion(),
            reply.is_positive_intermediate(),
            reply.is_transient_negative(),
            reply.is_permanent_negative(),
        ]
    }

    proptest! {
        #[test]
        fn prop_exactly_one_class_for_valid_codes(d1 in 0u8..10, d2 in 0u8..10, d3 in 0u8..10) {
            let mut reply = Reply::default();
            let valid = reply.set(format!("{d1}{d2}{d3} some text"));
            let set_count = primary_flags(&reply).iter().filter(|&&b| b).count();

            let expected_valid = (1..=5).contains(&d1) && d2 <= 5;
            prop_assert_eq!(valid, expected_valid);
            prop_assert_eq!(set_count, if expected_valid { 1 } else { 0 });
            prop_assert_eq!(reply.is_positive() || reply.is_negative(), expected_valid);
        }
    }

    #[test]
    fn test_short_and_garbage_replies() {
        let mut reply = Reply::default();
        assert!(!reply.set("22"));
        assert!(!reply.set(""));
        assert!(!reply.set("abc def"));
        assert!(!reply.is_set());
        assert_eq!(reply.text(), "abc def");
        assert!(reply.set("226"));
    }

    #[test]
    fn test_categories() {
        let reply = Reply::new("530 Not logged in.");
        let code = reply.code().unwrap();
        assert!(code.is_authentication());
        assert!(!code.is_file_system());
        assert_eq!(code.value(), 530);
        assert_eq!(reply.message(), "Not logged in.");

        let code = Reply::new("550 No such file").code().unwrap();
        assert!(code.is_file_system());
        assert!(Reply::new("200 Type set").code().unwrap().is_syntax());
        assert!(Reply::new("425 Can't open").code().unwrap().is_connections());
    }

    #[test]
    fn test_simple_outcome() {
        assert_eq!(CommandOutcome::from_reply(&Reply::new("250 Ok")), CommandOutcome::Ok);
        assert_eq!(CommandOutcome::from_reply(&Reply::new("450 Busy")), CommandOutcome::NotOk);
        assert_eq!(CommandOutcome::from_reply(&Reply::new("550 No")), CommandOutcome::NotOk);
        assert_eq!(CommandOutcome::from_reply(&Reply::new("350 More")), CommandOutcome::Error);
        assert_eq!(CommandOutcome::from_reply(&Reply::new("xyz")), CommandOutcome::Error);
    }
}
