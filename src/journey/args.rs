//! # Opaque action argument payload.
//!
//! [`Args`] carries the descriptor's `args` JSON verbatim from the loader to
//! the handler. Only the handler decides what the payload means, via
//! [`Args::parse`].

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use crate::error::ActionError;

/// Raw JSON argument text, or nothing.
#[derive(Clone, Default)]
pub struct Args(Option<Box<RawValue>>);

impl Args {
    /// An absent payload.
    pub fn none() -> Self {
        Self(None)
    }

    /// Wraps JSON text. Fails if the text is not valid JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.to_string()).map(|raw| Self(Some(raw)))
    }

    /// The payload text exactly as it appeared in the journey.
    pub fn raw(&self) -> Option<&str> {
        self.0.as_deref().map(RawValue::get)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Decodes the payload. An absent payload decodes as JSON `null`.
    ///
    /// Decoding failures become [`ActionError::BadArgs`].
    ///
    /// # Example
    /// ```
    /// use serde::Deserialize;
    /// use cuj_runner::Args;
    ///
    /// #[derive(Deserialize)]
    /// struct OpenUrl { url: String }
    ///
    /// let args = Args::from_json(r#"{"url":"https://example.test/"}"#).unwrap();
    /// let parsed: OpenUrl = args.parse().unwrap();
    /// assert_eq!(parsed.url, "https://example.test/");
    ///
    /// assert!(Args::none().parse::<OpenUrl>().is_err());
    /// ```
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ActionError> {
        serde_json::from_str(self.raw().unwrap_or("null")).map_err(ActionError::bad_args)
    }

    pub(crate) fn into_raw(self) -> Option<Box<RawValue>> {
        self.0
    }
}

impl From<Option<Box<RawValue>>> for Args {
    fn from(raw: Option<Box<RawValue>>) -> Self {
        Self(raw)
    }
}

impl PartialEq for Args {
    fn eq(&self, other: &Self) -> bool {
        self.raw() == other.raw()
    }
}

impl Eq for Args {}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.raw() {
            Some(raw) => write!(f, "Args({raw})"),
            None => f.write_str("Args(none)"),
        }
    }
}
