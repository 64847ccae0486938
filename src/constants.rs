//! Sizes and wire constants for additional authenticated data.

/// Size of the UUID field of an AAD value.
pub const AAD_UUID_SIZE: usize = 16;

/// Size of the purpose field of an AAD value.
pub const AAD_PURPOSE_SIZE: usize = 16;

/// Size of the SHA-256 digest that leads an AAD value.
pub const AAD_DIGEST_SIZE: usize = 32;

/// Total size of an AAD value.
pub const AAD_SIZE: usize = AAD_DIGEST_SIZE + AAD_PURPOSE_SIZE + AAD_UUID_SIZE;

/// UUID of AAD bound into PCE get-info assertions.
pub const GET_PCE_INFO_AAD_UUID: &str = "8f3c2a9e-51d4-4b7a-a6e2-0c9d7f14b3e8";

/// Purpose of AAD bound into PCE get-info assertions.
pub const GET_PCE_INFO_AAD_PURPOSE: &[u8; AAD_PURPOSE_SIZE] = b"PCE GET INFO    ";

/// UUID of AAD bound into PCE sign-report assertions.
pub const PCE_SIGN_REPORT_AAD_UUID: &str = "2d7e6b14-93af-4c58-8e01-b5f4a2c6d907";

/// Purpose of AAD bound into PCE sign-report assertions.
pub const PCE_SIGN_REPORT_AAD_PURPOSE: &[u8; AAD_PURPOSE_SIZE] = b"PCE SIGN REPORT ";

/// UUID of AAD bound into enclave key exchange protocol (EKEP) assertions.
pub const EKEP_AAD_UUID: &str = "c41a9f6d-0b3e-4f27-9d85-7e2a6c1b48f3";

/// Purpose of AAD bound into EKEP assertions.
pub const EKEP_AAD_PURPOSE: &[u8; AAD_PURPOSE_SIZE] = b"EKEP HANDSHAKE  ";
