/*
    Copyright 2025 MydriaTech AB

    Licensed under the Apache License 2.0 with Free world makers exception
    1.0.0 (the "License"); you may not use this file except in compliance with
    the License. You should have obtained a copy of the License with the source
    or binary distribution in file named

        LICENSE-Apache-2.0-with-FWM-Exception-1.0.0

    Unless required by applicable law or agreed to in writing, software
    distributed under the License is distributed on an "AS IS" BASIS,
    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
    See the License for the specific language governing permissions and
    limitations under the License.
*/

//! Gateway errors.

use std::error::Error;
use std::fmt;

/// Cause of error.
#[derive(Debug, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// General failure. See message for details.
    Unspecified,
    /// Authentication failed. Missing, expired or invalid token.
    AuthenticationFailure,
    /// Authenticated, but not allowed to perform the operation.
    Unauthorized,
    /// Malformed request or arguments that don't match the tool contract.
    Validation,
    /// Aggregate, tool or other referenced object does not exist.
    NotFound,
    /// Optimistic concurrency check failed. Retryable.
    ConcurrencyConflict,
    /// A protected dependency's circuit breaker is open.
    CircuitOpen,
    /// Upstream service failure (5xx, network error or timeout).
    UpstreamFailure,
    /// Backing store temporarily unavailable.
    Transient,
    /// Rejected OpenAPI document during inventory refresh.
    SpecRejected,
    /// Command violates an aggregate business rule.
    BusinessRule,
}

impl GatewayErrorKind {
    /// Create a new instance with an error message.
    pub fn error_with_msg<S: AsRef<str>>(self, msg: S) -> GatewayError {
        GatewayError {
            kind: self,
            msg: Some(msg.as_ref().to_string()),
        }
    }

    /// Create a new instance without an error message.
    pub fn error(self) -> GatewayError {
        GatewayError {
            kind: self,
            msg: None,
        }
    }
}

impl fmt::Display for GatewayErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/** Gateway error.

Create a new instance via [GatewayErrorKind].
*/
#[derive(Debug)]
pub struct GatewayError {
    kind: GatewayErrorKind,
    msg: Option<String>,
}

impl GatewayError {
    /// Return the type of error.
    pub fn kind(&self) -> &GatewayErrorKind {
        &self.kind
    }

    /// Return the optional error message.
    pub fn message(&self) -> Option<&str> {
        self.msg.as_deref()
    }
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(msg) = &self.msg {
            write!(f, "{} {}", self.kind, msg)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

impl AsRef<GatewayError> for GatewayError {
    fn as_ref(&self) -> &GatewayError {
        self
    }
}

impl Error for GatewayError {}
