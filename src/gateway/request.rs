//! Lookup request schema.
//!
//! The body is decoded straight into [`LookupRequest`], whose postal code
//! only exists once validated. Syntax errors and shape errors come out of
//! serde as different categories, which the handler maps to 400 and 422.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use thiserror::Error;

use crate::gateway::error::GatewayError;

/// Exactly eight ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid zipcode")]
pub struct InvalidPostalCode;

impl PostalCode {
    pub const LEN: usize = 8;

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(s: &str) -> bool {
        s.len() == Self::LEN && s.bytes().all(|b| b.is_ascii_digit())
    }
}

impl TryFrom<String> for PostalCode {
    type Error = InvalidPostalCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidPostalCode)
        }
    }
}

impl FromStr for PostalCode {
    type Err = InvalidPostalCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl From<PostalCode> for String {
    fn from(code: PostalCode) -> Self {
        code.0
    }
}

impl AsRef<str> for PostalCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /weather`. `cep` is accepted as an alias of `postalCode`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupRequest {
    #[serde(alias = "cep")]
    pub postal_code: PostalCode,
}

impl LookupRequest {
    /// Decode a request body.
    pub fn from_body(body: &[u8]) -> Result<Self, GatewayError> {
        serde_json::from_slice(body).map_err(|e| match e.classify() {
            Category::Data => GatewayError::InvalidZip,
            Category::Syntax | Category::Eof | Category::Io => GatewayError::MalformedBody(e),
        })
    }
}
