use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;

/// One token of input, handed to exactly one worker
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Record(Vec<u8>);

impl Record {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Text view used by templates. Invalid UTF-8 is replaced.
    pub fn to_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }

    /// Argument view used when appending the record to a command line.
    ///
    /// On Unix the bytes are passed through untouched so records with
    /// non-UTF-8 file names still reach the child intact.
    #[cfg(unix)]
    pub fn to_os_string(&self) -> OsString {
        use std::os::unix::ffi::OsStringExt;
        OsString::from_vec(self.0.clone())
    }

    #[cfg(not(unix))]
    pub fn to_os_string(&self) -> OsString {
        OsString::from(self.to_text().into_owned())
    }
}

impl From<&str> for Record {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Record {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
