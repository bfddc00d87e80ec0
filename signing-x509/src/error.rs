// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Errors common to the X.509 primitives in this crate.

use thiserror::Error;

/// Unified error type for X.509 certificate handling.
#[derive(Debug, Error)]
pub enum X509CertificateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ASN.1 decode error: {0}")]
    Decode(#[from] bcder::decode::DecodeError<std::convert::Infallible>),

    #[error("PEM decode error: {0}")]
    PemDecode(pem::PemError),

    #[error("unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(String),

    #[error("unknown key algorithm: {0}")]
    UnknownKeyAlgorithm(String),

    #[error("unknown signature algorithm: {0}")]
    UnknownSignatureAlgorithm(String),

    #[error("unknown elliptic curve: {0}")]
    UnknownEllipticCurve(String),

    #[error("key algorithm parameters not handled: {0}")]
    UnhandledKeyAlgorithmParameters(String),

    #[error("RSA key generation is not supported by this backend")]
    RsaKeyGenerationNotSupported,

    #[error("error generating key pair")]
    KeyPairGenerationError,

    #[error("certificate signature verification failed")]
    CertificateSignatureVerificationFailed,

    #[error("signature verification not supported for this algorithm combination")]
    UnsupportedSignatureVerification,

    #[error("{0}")]
    Other(String),
}
