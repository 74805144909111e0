//! Payload keys written by the built-in generators

/// PEM CA certificate
pub const CA_CERTIFICATE: &str = "ca.crt";
/// PEM CA private key
pub const CA_PRIVATE_KEY: &str = "ca.key";
/// PEM leaf certificate
pub const TLS_CERTIFICATE: &str = "tls.crt";
/// PEM leaf private key
pub const TLS_PRIVATE_KEY: &str = "tls.key";
/// Bearer token
pub const TOKEN: &str = "token";
/// Token file in the kube-apiserver `--token-auth-file` format
pub const STATIC_TOKENS_CSV: &str = "static_tokens.csv";
/// Basic auth username
pub const USERNAME: &str = "username";
/// Basic auth password
pub const PASSWORD: &str = "password";
/// Basic auth file line in `password,user,uid` CSV format
pub const AUTH: &str = "auth";
/// Concatenated PEM CA certificates
pub const BUNDLE_CERTIFICATE: &str = "bundle.crt";
