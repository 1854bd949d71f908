//! Transfer parameters: representation type, structure and mode

use std::fmt;
use std::str::FromStr;

use crate::commands::Arguments;

/// File structure (`STRU`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Structure {
    File,
    Record,
    Page,
}

/// Transfer mode (`MODE`). Only `Stream` is implemented by the data channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Stream,
    Block,
    Compressed,
}

/// Representation type (`TYPE`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Ascii,
    Ebcdic,
    Image,
    LocalByte,
}

/// Format control for ASCII and EBCDIC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFormat {
    NonPrint,
    TelnetFormat,
    CarriageControl,
}

macro_rules! code_enum {
    ($name:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $name {
            /// Single-letter protocol code
            pub fn code(self) -> char {
                match self {
                    $($name::$variant => $code,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.code())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $(s if s.len() == 1 && s.starts_with($code) => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {} code: {}", stringify!($name), s)),
                }
            }
        }
    };
}

code_enum!(Structure { File => 'F', Record => 'R', Page => 'P' });
code_enum!(TransferMode { Stream => 'S', Block => 'B', Compressed => 'C' });
code_enum!(Type { Ascii => 'A', Ebcdic => 'E', Image => 'I', LocalByte => 'L' });
code_enum!(TypeFormat { NonPrint => 'N', TelnetFormat => 'T', CarriageControl => 'C' });

const DEFAULT_BYTE_SIZE: u8 = 8;

/// Representation type plus its optional format or byte size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Representation {
    kind: Type,
    format: Option<TypeFormat>,
    byte_size: u8,
}

impl Representation {
    pub fn new(kind: Type) -> Self {
        Self {
            kind,
            format: None,
            byte_size: DEFAULT_BYTE_SIZE,
        }
    }

    pub fn with_format(kind: Type, format: TypeFormat) -> Self {
        Self {
            format: Some(format),
            ..Self::new(kind)
        }
    }

    pub fn local_byte(byte_size: u8) -> Self {
        Self {
            byte_size,
            ..Self::new(Type::LocalByte)
        }
    }

    pub fn ascii() -> Self {
        Self::new(Type::Ascii)
    }

    pub fn image() -> Self {
        Self::new(Type::Image)
    }

    pub fn kind(&self) -> Type {
        self.kind
    }

    pub fn format(&self) -> Option<TypeFormat> {
        self.format
    }

    pub fn byte_size(&self) -> u8 {
        self.byte_size
    }

    /// Arguments of the `TYPE` command
    pub fn arguments(&self) -> Arguments {
        let args = Arguments::from(self.kind.code().to_string());
        match (self.kind, self.format) {
            (Type::LocalByte, _) => args.arg(self.byte_size.to_string()),
            (_, Some(format)) => args.arg(format.code().to_string()),
            (_, None) => args,
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TYPE{}", self.arguments())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(Structure::Record.code(), 'R');
        assert_eq!(TransferMode::Compressed.to_string(), "C");
        assert_eq!("i".parse::<Type>(), Ok(Type::Image));
        assert_eq!("T".parse::<TypeFormat>(), Ok(TypeFormat::TelnetFormat));
        assert!("X".parse::<Structure>().is_err());
        assert!("FF".parse::<Structure>().is_err());
    }

    #[test]
    fn test_type_arguments() {
        assert_eq!(Representation::image().arguments().to_string(), " I");
        assert_eq!(
            Representation::with_format(Type::Ascii, TypeFormat::NonPrint)
                .arguments()
                .to_string(),
            " A N"
        );
        assert_eq!(Representation::new(Type::LocalByte).to_string(), "TYPE L 8");
        assert_eq!(Representation::local_byte(36).to_string(), "TYPE L 36");
    }
}
