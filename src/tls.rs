//! TLS bootstrap for the HTTPS listener.
//!
//! There is no certificate configuration surface; every run generates a
//! fresh, ephemeral self-signed certificate for `localhost` / `127.0.0.1`
//! via `rcgen`, the same way the teacher's self-signed branch worked.

use axum_server::tls_rustls::RustlsConfig;

pub async fn build_rustls_config() -> Result<RustlsConfig, Box<dyn std::error::Error>> {
    let subject_alt_names = vec!["localhost".to_string(), "127.0.0.1".to_string()];
    let cert_params = rcgen::CertificateParams::new(subject_alt_names)?;
    let key_pair = rcgen::KeyPair::generate()?;
    let cert = cert_params.self_signed(&key_pair)?;
    let cert_pem = cert.pem();
    let key_pem = key_pair.serialize_pem();
    Ok(RustlsConfig::from_pem(cert_pem.into(), key_pem.into()).await?)
}
