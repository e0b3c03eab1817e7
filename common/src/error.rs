//! Error types shared by the ante pipeline and the send manager.
//!
//! Every failure surfaced to a client carries a stable numeric
//! [`ErrorCode`] plus a diagnostic message. Codes never change meaning
//! once assigned; new conditions get new codes appended at the end.

use core::fmt;
use num_derive::{FromPrimitive, ToPrimitive};

/// Stable error codes surfaced to clients.
///
/// Each variant maps to a specific failure condition. The `Display`
/// strings are intentionally terse; context goes in [`Error::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromPrimitive, ToPrimitive)]
#[repr(u32)]
pub enum ErrorCode {
    /// A panic was caught at the pipeline boundary.
    Panic = 0x01,

    /// Request is missing something the handler needs.
    UnknownRequest = 0x02,

    /// Extension option with an unrecognized type tag.
    UnknownExtensionOption = 0x03,

    /// Chain id malformed or not matching the signed chain id.
    InvalidChainID = 0x04,

    /// Public key missing, malformed, or of the wrong algorithm.
    InvalidPubKey = 0x05,

    /// No signature target verified.
    InvalidSigner = 0x06,

    /// Account sequence does not match the signature sequence.
    WrongSequence = 0x07,

    /// More signatures than permitted.
    TooManySignatures = 0x08,

    /// Transaction carries no signatures.
    NoSignatures = 0x09,

    /// Feature or mode not supported on this path.
    NotSupported = 0x0A,

    /// Signer set does not authorize the transaction.
    Unauthorized = 0x0B,

    /// Value has the wrong type or shape.
    InvalidType = 0x0C,

    /// Denom router table is internally inconsistent.
    RouterInconsistent = 0x0D,

    /// Router registration with an empty prefix.
    EmptyPrefix = 0x0E,

    /// Router prefix already registered.
    AlreadyRegistered = 0x0F,

    /// Router prefix overlaps an existing prefix.
    Overlap = 0x10,

    /// Gas limit exceeded.
    OutOfGas = 0x11,

    /// Account balance too low.
    InsufficientFunds = 0x12,

    /// Fee too low or allowance exhausted.
    InsufficientFee = 0x13,

    /// Address failed to decode.
    InvalidAddress = 0x14,

    /// Structurally invalid request.
    InvalidRequest = 0x15,

    /// Malformed coin or coin list.
    InvalidCoins = 0x16,

    /// Block height is past the transaction timeout height.
    TxTimeoutHeight = 0x17,

    /// Memo longer than the chain permits.
    MemoTooLarge = 0x18,

    /// Account does not exist.
    UnknownAddress = 0x19,

    /// Every IBC packet in the transaction was already relayed.
    RedundantTx = 0x1A,

    /// Signature bytes have the wrong length or encoding.
    InvalidSignatureFormat = 0x1B,

    /// Gas limit is zero or above the chain maximum.
    InvalidGasLimit = 0x1C,

    /// Wire bytes failed to decode.
    TxDecode = 0x1D,

    /// EIP-712 typed data could not be built or encoded.
    InvalidTypedData = 0x1E,
}

impl ErrorCode {
    /// Returns the error code as a u32.
    #[inline]
    pub fn code(self) -> u32 {
        self as u32
    }

    /// Attaches a diagnostic message to this code.
    pub fn wrap(self, message: impl Into<String>) -> Error {
        Error::new(self, message)
    }

    /// Returns true for authentication failures, which clients resolve by
    /// resubmitting a freshly signed transaction.
    #[inline]
    pub fn is_auth_failure(self) -> bool {
        matches!(
            self,
            ErrorCode::InvalidSigner
                | ErrorCode::WrongSequence
                | ErrorCode::InvalidChainID
                | ErrorCode::InvalidPubKey
                | ErrorCode::Unauthorized
        )
    }

    /// Returns true for conditions that indicate a bug rather than bad input.
    #[inline]
    pub fn is_internal(self) -> bool {
        matches!(self, ErrorCode::Panic | ErrorCode::RouterInconsistent)
    }

    /// Returns true for errors raised by router registration.
    #[inline]
    pub fn is_registration_error(self) -> bool {
        matches!(
            self,
            ErrorCode::EmptyPrefix | ErrorCode::AlreadyRegistered | ErrorCode::Overlap
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::Panic => "panic",
            ErrorCode::UnknownRequest => "unknown request",
            ErrorCode::UnknownExtensionOption => "unknown extension options",
            ErrorCode::InvalidChainID => "invalid chain-id",
            ErrorCode::InvalidPubKey => "invalid pubkey",
            ErrorCode::InvalidSigner => "tx intended signer does not match the given signer",
            ErrorCode::WrongSequence => "incorrect account sequence",
            ErrorCode::TooManySignatures => "maximum number of signatures exceeded",
            ErrorCode::NoSignatures => "no signatures supplied",
            ErrorCode::NotSupported => "feature not supported",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::InvalidType => "invalid type",
            ErrorCode::RouterInconsistent => "denom router inconsistent",
            ErrorCode::EmptyPrefix => "empty denom prefix",
            ErrorCode::AlreadyRegistered => "denom prefix already registered",
            ErrorCode::Overlap => "denom prefix overlaps a registered prefix",
            ErrorCode::OutOfGas => "out of gas",
            ErrorCode::InsufficientFunds => "insufficient funds",
            ErrorCode::InsufficientFee => "insufficient fee",
            ErrorCode::InvalidAddress => "invalid address",
            ErrorCode::InvalidRequest => "invalid request",
            ErrorCode::InvalidCoins => "invalid coins",
            ErrorCode::TxTimeoutHeight => "tx timeout height",
            ErrorCode::MemoTooLarge => "memo too large",
            ErrorCode::UnknownAddress => "unknown address",
            ErrorCode::RedundantTx => "tx is redundant",
            ErrorCode::InvalidSignatureFormat => "invalid signature format",
            ErrorCode::InvalidGasLimit => "invalid gas limit",
            ErrorCode::TxDecode => "tx parse error",
            ErrorCode::InvalidTypedData => "invalid typed data",
        };
        f.write_str(s)
    }
}

/// An [`ErrorCode`] plus the diagnostic message returned to the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}: {code}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Prepends more context, keeping the original code.
    pub fn context(self, message: impl fmt::Display) -> Self {
        Self {
            code: self.code,
            message: format!("{}: {}", message, self.message),
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(code: ErrorCode) -> Self {
        Error::new(code, code.to_string())
    }
}

pub type Result<T> = core::result::Result<T, Error>;
