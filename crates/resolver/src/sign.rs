//! Direct-link URL signing.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign a path for the direct-link service.
///
/// The signature covers `"<path>:<expire>"` with HMAC-SHA256 under the
/// service token, and is rendered as `base64url(mac):expire`. An expiry of
/// `0` means the link never expires.
pub fn sign_path(token: &str, path: &str, expire: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(token.as_bytes()).expect("hmac accepts any key length");
    mac.update(path.as_bytes());
    mac.update(b":");
    mac.update(expire.to_string().as_bytes());
    format!("{}:{}", URL_SAFE.encode(mac.finalize().into_bytes()), expire)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let a = sign_path("secret", "/media/movie.mkv", 0);
        let b = sign_path("secret", "/media/movie.mkv", 0);
        assert_eq!(a, b);
    }

    #[test]
    fn signature_varies_with_token_and_path() {
        let base = sign_path("secret", "/media/movie.mkv", 0);
        assert_ne!(base, sign_path("other", "/media/movie.mkv", 0));
        assert_ne!(base, sign_path("secret", "/media/other.mkv", 0));
    }

    #[test]
    fn trailing_expiry_and_urlsafe_alphabet() {
        let sig = sign_path("secret", "/media/movie.mkv", 1700000000);
        let (mac, expire) = sig.rsplit_once(':').unwrap();
        assert_eq!(expire, "1700000000");
        assert!(mac
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=')));
    }
}
