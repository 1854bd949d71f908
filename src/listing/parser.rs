//! `LIST` output parsing
//!
//! Understands the formats described by D. J. Bernstein's ftpparse: EPLF,
//! UNIX `ls` (with or without gid, including Windows, WFTPD, NetWare and
//! NetPresenz variants), MultiNet/VMS and MSDOS. Lines matching none of
//! them yield `None`.

use chrono::Utc;
use log::debug;

use crate::listing::calendar::{get_year, guess_tai, to_tai};
use crate::listing::file_status::{FileStatus, IdType, MTimeType, SizeType};

const MONTHS: [&[u8; 3]; 12] = [
    b"jan", b"feb", b"mar", b"apr", b"may", b"jun", b"jul", b"aug", b"sep", b"oct", b"nov",
    b"dec",
];

/// Turns one raw listing line into a [`FileStatus`]
pub trait FileListParser: Send {
    fn parse(&mut self, line: &str) -> Option<FileStatus>;
}

fn system_clock() -> i64 {
    Utc::now().timestamp()
}

/// Default listing parser
pub struct ListParser {
    base: i64,
    current_year: Option<i64>,
    clock: fn() -> i64,
}

impl ListParser {
    pub fn new() -> Self {
        Self::with_clock(system_clock)
    }

    /// Parser reading "now" from `clock` (seconds since the Unix epoch)
    pub fn with_clock(clock: fn() -> i64) -> Self {
        Self {
            base: -to_tai(1970, 0, 1),
            current_year: None,
            clock,
        }
    }

    /// Date without year: pick the candidate closest before now.
    ///
    /// The current year is computed on first use and then kept for the
    /// lifetime of the parser.
    fn guess_tai(&mut self, month: i64, mday: i64) -> i64 {
        let now = (self.clock)() - self.base;
        let current_year = *self.current_year.get_or_insert_with(|| get_year(now));
        guess_tai(now, current_year, month, mday)
    }

    /// EPLF: `+i8388621.29609,m824255902,/,\tdev`
    fn parse_eplf(&self, line: &str) -> Option<FileStatus> {
        let bytes = line.as_bytes();
        let mut status = FileStatus::default();
        let mut fact_start = 1;

        for j in 1..bytes.len() {
            match bytes[j] {
                b'\t' => {
                    status.name = line[j + 1..].to_string();
                    return Some(status);
                }
                b',' => {
                    let value = bytes.get(fact_start + 1..j).unwrap_or_default();
                    match bytes[fact_start] {
                        b'/' => status.cwd_possible = true,
                        b'r' => status.retr_possible = true,
                        b's' => {
                            status.size_type = SizeType::Binary;
                            status.size = match parse_decimal(value) {
                                (size, true) => size,
                                _ => -1,
                            };
                        }
                        b'm' => {
                            status.mtime_type = MTimeType::Local;
                            status.mtime = self.base + parse_decimal(value).0;
                        }
                        b'i' => {
                            status.id_type = IdType::Full;
                            status.id = String::from_utf8_lossy(value).into_owned();
                        }
                        _ => {}
                    }
                    fact_start = j + 1;
                }
                _ => {}
            }
        }
        None
    }

    /// UNIX `ls -l` and look-alikes:
    /// `-rw-r--r--   1 root     other        531 Jan 29 03:26 README`
    fn parse_unix(&mut self, line: &str) -> Option<FileStatus> {
        let bytes = line.as_bytes();
        let mut status = FileStatus::default();

        match bytes[0] {
            b'd' => status.cwd_possible = true,
            b'-' => status.retr_possible = true,
            b'l' => {
                status.cwd_possible = true;
                status.retr_possible = true;
            }
            _ => {}
        }

        let mut state = 1;
        let mut start = 0;
        let mut size = 0;
        let mut month = 0;
        let mut mday = 0;

        for j in 1..bytes.len() {
            if bytes[j] != b' ' || bytes[j - 1] == b' ' {
                continue;
            }
            let field = &bytes[start..j];
            let text = &line[start..j];

            match state {
                // permissions
                1 => {
                    status.attributes = text.to_string();
                    state = 2;
                }
                // link count
                2 => {
                    status.link = text.to_string();
                    state = 3;
                    // NetPresenz puts "folder" here
                    if field.len() == 6 && field[0] == b'f' {
                        state = 4;
                    }
                }
                // uid
                3 => {
                    status.uid = text.to_string();
                    state = 4;
                }
                // tentative size, or gid when not numeric
                4 => {
                    size = match parse_decimal(field) {
                        (value, true) => value,
                        _ => {
                            status.gid = text.to_string();
                            -1
                        }
                    };
                    state = 5;
                }
                // month, otherwise this is the real size
                5 => match month_index(field) {
                    Some(index) => {
                        month = index;
                        state = 6;
                    }
                    None => {
                        size = match parse_decimal(field) {
                            (value, true) => value,
                            _ => -1,
                        };
                    }
                },
                // day of month
                6 => {
                    mday = parse_decimal(field).0;
                    state = 7;
                }
                // time of day or year
                7 => {
                    if field.len() == 4 && field[1] == b':' {
                        let hour = parse_decimal(&field[..1]).0;
                        let minute = parse_decimal(&field[2..4]).0;
                        if !valid_day(mday) || !valid_time(hour, minute) {
                            return None;
                        }
                        status.mtime_type = MTimeType::RemoteMinute;
                        status.mtime =
                            self.base + self.guess_tai(month, mday) + hour * 3600 + minute * 60;
                    } else if field.len() == 5 && field[2] == b':' {
                        let hour = parse_decimal(&field[..2]).0;
                        let minute = parse_decimal(&field[3..5]).0;
                        if !valid_day(mday) || !valid_time(hour, minute) {
                            return None;
                        }
                        status.mtime_type = MTimeType::RemoteMinute;
                        status.mtime =
                            self.base + self.guess_tai(month, mday) + hour * 3600 + minute * 60;
                    } else if field.len() >= 4 {
                        let year = parse_decimal(field).0;
                        if !valid_date(year, month, mday) {
                            return None;
                        }
                        status.mtime_type = MTimeType::RemoteDay;
                        status.mtime = self.base + to_tai(year, month, mday);
                    } else {
                        return None;
                    }

                    status.name = line[j + 1..].to_string();
                    state = 8;
                }
                _ => {}
            }

            start = j + 1;
            while start < bytes.len() && bytes[start] == b' ' {
                start += 1;
            }
        }

        if state != 8 {
            return None;
        }

        status.size = size;
        status.size_type = SizeType::Binary;

        if bytes[0] == b'l' {
            if let Some(pos) = status.name.find(" -> ") {
                status.name.truncate(pos);
            }
        }

        // NetWare pads names with three spaces
        if (bytes[1] == b' ' || bytes[1] == b'[')
            && status.name.len() > 3
            && status.name.starts_with("   ")
        {
            status.name.replace_range(..3, "");
        }

        Some(status)
    }

    /// MultiNet / VMS:
    /// `CORE.DIR;1          1  8-SEP-1996 16:09 [SYSTEM] (RWE,RWE,RE,RE)`
    fn parse_multinet(&self, line: &str) -> Option<FileStatus> {
        let bytes = line.as_bytes();
        let mut status = FileStatus::default();

        let semicolon = line.find(';')?;
        status.name = line[..semicolon].to_string();
        if semicolon > 4 && &bytes[semicolon - 4..semicolon] == b".DIR" {
            status.name.truncate(semicolon - 4);
            status.cwd_possible = true;
        } else {
            status.retr_possible = true;
        }

        let mut cursor = Cursor::new(bytes, semicolon);
        cursor.skip_until(|b| b == b' ')?;
        cursor.skip_while(|b| b == b' ')?;
        cursor.skip_until(|b| b == b' ')?;
        cursor.skip_while(|b| b == b' ')?;

        let mday = parse_decimal(cursor.take_until(|b| b == b'-')?).0;
        cursor.skip_while(|b| b == b'-')?;
        let month = month_index(cursor.take_until(|b| b == b'-')?)?;
        cursor.skip_while(|b| b == b'-')?;
        let year = parse_decimal(cursor.take_until(|b| b == b' ')?).0;
        cursor.skip_while(|b| b == b' ')?;
        let hour = parse_decimal(cursor.take_until(|b| b == b':')?).0;
        cursor.skip_while(|b| b == b':')?;
        let minute = parse_decimal(cursor.take_until(|b| b == b':' || b == b' ')?).0;
        if !valid_date(year, month, mday) || !valid_time(hour, minute) {
            return None;
        }

        status.mtime_type = MTimeType::RemoteMinute;
        status.mtime = self.base + to_tai(year, month, mday) + hour * 3600 + minute * 60;
        Some(status)
    }

    /// MSDOS / IIS:
    /// `04-27-00  09:09PM       <DIR>          licensed`
    fn parse_msdos(&self, line: &str) -> Option<FileStatus> {
        let bytes = line.as_bytes();
        let mut status = FileStatus::default();
        let mut cursor = Cursor::new(bytes, 0);

        let month = parse_decimal(cursor.take_until(|b| b == b'-')?).0 - 1;
        cursor.skip_while(|b| b == b'-')?;
        let mday = parse_decimal(cursor.take_until(|b| b == b'-')?).0;
        cursor.skip_while(|b| b == b'-')?;
        let mut year = parse_decimal(cursor.take_until(|b| b == b' ')?).0;
        if year < 50 {
            year += 2000;
        }
        if year < 1000 {
            year += 1900;
        }

        cursor.skip_while(|b| b == b' ')?;
        let mut hour = parse_decimal(cursor.take_until(|b| b == b':')?).0;
        cursor.skip_while(|b| b == b':')?;
        let minute = parse_decimal(cursor.take_until(|b| b == b'A' || b == b'P')?).0;

        if hour == 12 {
            hour = 0;
        }
        cursor.skip_byte(b'A')?;
        if cursor.skip_byte(b'P')? {
            hour += 12;
        }
        cursor.skip_byte(b'M')?;
        if !valid_date(year, month, mday) || !valid_time(hour, minute) {
            return None;
        }

        cursor.skip_while(|b| b == b' ')?;
        if cursor.peek() == b'<' {
            status.cwd_possible = true;
            cursor.skip_until(|b| b == b' ')?;
        } else {
            status.size = match parse_decimal(cursor.take_until(|b| b == b' ')?) {
                (size, true) => size,
                _ => -1,
            };
            status.size_type = SizeType::Binary;
            status.retr_possible = true;
        }
        cursor.skip_while(|b| b == b' ')?;

        status.name = line[cursor.pos..].to_string();
        status.mtime_type = MTimeType::RemoteMinute;
        status.mtime = self.base + to_tai(year, month, mday) + hour * 3600 + minute * 60;
        Some(status)
    }
}

impl Default for ListParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FileListParser for ListParser {
    fn parse(&mut self, line: &str) -> Option<FileStatus> {
        // an empty EPLF name with no facts is two characters long
        if line.len() < 2 {
            return None;
        }

        let parsed = match line.as_bytes()[0] {
            b'+' => self.parse_eplf(line),
            b'b' | b'c' | b'd' | b'l' | b'p' | b's' | b'-' => self.parse_unix(line),
            _ if line.contains(';') => self.parse_multinet(line),
            first if first.is_ascii_digit() => self.parse_msdos(line),
            // "total 14786", "DISK$ANONFTP:[ANONYMOUS]" and similar
            _ => None,
        };

        if parsed.is_none() {
            debug!("Skipping listing line: '{}'", line);
        }
        parsed
    }
}

/// Three-letter month name, case-insensitive, to a zero-based index
fn month_index(field: &[u8]) -> Option<i64> {
    if field.len() != 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|month| field.eq_ignore_ascii_case(&month[..]))
        .map(|index| index as i64)
}

fn valid_day(mday: i64) -> bool {
    (1..=31).contains(&mday)
}

/// Date fields in range for the day-count arithmetic
fn valid_date(year: i64, month: i64, mday: i64) -> bool {
    (0..=9999).contains(&year) && (0..12).contains(&month) && valid_day(mday)
}

fn valid_time(hour: i64, minute: i64) -> bool {
    (0..24).contains(&hour) && (0..60).contains(&minute)
}

/// Leading decimal value of `field`, and whether the whole field was numeric.
///
/// Leading blanks and a `+` sign are accepted; an empty field reads as 0.
fn parse_decimal(field: &[u8]) -> (i64, bool) {
    let start = field
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(field.len());
    let mut digits = &field[start..];
    if let [b'+', rest @ ..] = digits {
        digits = rest;
    }

    let end = digits
        .iter()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    let value = digits[..end]
        .iter()
        .fold(0i64, |acc, &b| acc.saturating_mul(10).saturating_add((b - b'0') as i64));
    (value, end == digits.len())
}

/// Positional scanner. Every move that runs off the end of the line fails.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn peek(&self) -> u8 {
        self.bytes[self.pos]
    }

    fn advance(&mut self) -> Option<()> {
        self.pos += 1;
        (self.pos < self.bytes.len()).then_some(())
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) -> Option<()> {
        while pred(self.peek()) {
            self.advance()?;
        }
        Some(())
    }

    fn skip_until(&mut self, pred: impl Fn(u8) -> bool) -> Option<()> {
        self.skip_while(|b| !pred(b))
    }

    /// Bytes from the current position up to (not including) the first
    /// byte matching `pred`
    fn take_until(&mut self, pred: impl Fn(u8) -> bool) -> Option<&'a [u8]> {
        let start = self.pos;
        self.skip_until(pred)?;
        Some(&self.bytes[start..self.pos])
    }

    /// Step over `byte` if it is next. Returns whether it was there.
    fn skip_byte(&mut self, byte: u8) -> Option<bool> {
        if self.peek() != byte {
            return Some(false);
        }
        self.advance()?;
        Some(true)
    }
}
