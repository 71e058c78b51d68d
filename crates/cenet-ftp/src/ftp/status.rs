//! Closed enumeration of the FTP reply codes callers can observe.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
#[repr(u16)]
pub enum FtpStatusCode {
    /// No code could be read from the reply, or the code is not listed here.
    Undefined = 0,
    RestartMarker = 110,
    ServiceTemporarilyNotAvailable = 120,
    DataAlreadyOpen = 125,
    OpeningData = 150,
    CommandOK = 200,
    CommandExtraneous = 202,
    DirectoryStatus = 212,
    FileStatus = 213,
    SystemType = 215,
    SendUserCommand = 220,
    ClosingControl = 221,
    ClosingData = 226,
    EnteringPassive = 227,
    LoggedInProceed = 230,
    ServerWantsSecureSession = 234,
    FileActionOK = 250,
    PathnameCreated = 257,
    SendPasswordCommand = 331,
    NeedLoginAccount = 332,
    FileCommandPending = 350,
    ServiceNotAvailable = 421,
    CantOpenData = 425,
    ConnectionClosed = 426,
    ActionNotTakenFileUnavailableOrBusy = 450,
    ActionAbortedLocalProcessingError = 451,
    ActionNotTakenInsufficientSpace = 452,
    CommandSyntaxError = 500,
    ArgumentSyntaxError = 501,
    CommandNotImplemented = 502,
    BadCommandSequence = 503,
    NotLoggedIn = 530,
    AccountNeeded = 532,
    ActionNotTakenFileUnavailable = 550,
    ActionAbortedUnknownPageType = 551,
    FileActionAborted = 552,
    ActionNotTakenFilenameNotAllowed = 553,
}

impl FtpStatusCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            110 => Self::RestartMarker,
            120 => Self::ServiceTemporarilyNotAvailable,
            125 => Self::DataAlreadyOpen,
            150 => Self::OpeningData,
            200 => Self::CommandOK,
            202 => Self::CommandExtraneous,
            212 => Self::DirectoryStatus,
            213 => Self::FileStatus,
            215 => Self::SystemType,
            220 => Self::SendUserCommand,
            221 => Self::ClosingControl,
            226 => Self::ClosingData,
            227 => Self::EnteringPassive,
            230 => Self::LoggedInProceed,
            234 => Self::ServerWantsSecureSession,
            250 => Self::FileActionOK,
            257 => Self::PathnameCreated,
            331 => Self::SendPasswordCommand,
            332 => Self::NeedLoginAccount,
            350 => Self::FileCommandPending,
            421 => Self::ServiceNotAvailable,
            425 => Self::CantOpenData,
            426 => Self::ConnectionClosed,
            450 => Self::ActionNotTakenFileUnavailableOrBusy,
            451 => Self::ActionAbortedLocalProcessingError,
            452 => Self::ActionNotTakenInsufficientSpace,
            500 => Self::CommandSyntaxError,
            501 => Self::ArgumentSyntaxError,
            502 => Self::CommandNotImplemented,
            503 => Self::BadCommandSequence,
            530 => Self::NotLoggedIn,
            532 => Self::AccountNeeded,
            550 => Self::ActionNotTakenFileUnavailable,
            551 => Self::ActionAbortedUnknownPageType,
            552 => Self::FileActionAborted,
            553 => Self::ActionNotTakenFilenameNotAllowed,
            _ => Self::Undefined,
        }
    }

    /// Numeric value; `0` for `Undefined`.
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn is_undefined(self) -> bool {
        self == Self::Undefined
    }
}

impl Default for FtpStatusCode {
    fn default() -> Self {
        Self::Undefined
    }
}

impl From<u16> for FtpStatusCode {
    fn from(code: u16) -> Self {
        Self::from_code(code)
    }
}

impl fmt::Display for FtpStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.code(), self)
    }
}
