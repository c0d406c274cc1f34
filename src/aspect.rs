use std::fmt;
use std::str::FromStr;

/// Display aspect ratio as stored in the `IPL.AR` payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AspectRatio {
    Standard = 0,
    Widescreen = 1,
}

impl AspectRatio {
    /// Decode a payload byte.  Every nonzero value reads as widescreen,
    /// matching how [`toggle_byte`] treats it.
    pub fn from_byte(b: u8) -> Self {
        if b == 0 { AspectRatio::Standard } else { AspectRatio::Widescreen }
    }

    pub fn as_byte(self) -> u8 { self as u8 }

    pub fn toggled(self) -> Self {
        match self {
            AspectRatio::Standard   => AspectRatio::Widescreen,
            AspectRatio::Widescreen => AspectRatio::Standard,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Standard   => "4:3",
            AspectRatio::Widescreen => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "4:3" | "standard" | "0"    => Ok(AspectRatio::Standard),
            "16:9" | "widescreen" | "1" => Ok(AspectRatio::Widescreen),
            other => Err(format!("unknown aspect ratio '{other}' (expected 4:3 or 16:9)")),
        }
    }
}

/// Flip a raw payload byte: 0 becomes 1, anything else becomes 0.
pub fn toggle_byte(b: u8) -> u8 {
    if b == 0 { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_rule() {
        assert_eq!(toggle_byte(0), 1);
        assert_eq!(toggle_byte(1), 0);
        assert_eq!(toggle_byte(0x7f), 0);
        assert_eq!(toggle_byte(toggle_byte(0)), 0);
    }

    #[test]
    fn decode_and_label() {
        assert_eq!(AspectRatio::from_byte(0).to_string(), "4:3");
        assert_eq!(AspectRatio::from_byte(1).to_string(), "16:9");
        assert_eq!(AspectRatio::from_byte(2), AspectRatio::Widescreen);
        assert_eq!(AspectRatio::Widescreen.toggled().as_byte(), 0);
    }

    #[test]
    fn parse() {
        assert_eq!("16:9".parse::<AspectRatio>().unwrap(), AspectRatio::Widescreen);
        assert_eq!("Standard".parse::<AspectRatio>().unwrap(), AspectRatio::Standard);
        assert!("21:9".parse::<AspectRatio>().is_err());
    }
}
