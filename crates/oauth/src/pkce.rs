use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    rand::RngCore,
    sha2::{Digest, Sha256},
};

/// A PKCE verifier/challenge pair for a single login attempt.
///
/// The verifier stays server-side until the callback completes; only the
/// challenge is sent to the authorization server.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

/// Random bytes behind the verifier: 48 bytes encode to 64 base64url chars,
/// inside the 43-128 range RFC 7636 requires.
const VERIFIER_BYTES: usize = 48;

/// Generate a PKCE S256 pair from the OS CSPRNG.
pub fn generate_pkce() -> PkcePair {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    let verifier = URL_SAFE_NO_PAD.encode(bytes);
    let challenge = challenge_for(&verifier);

    PkcePair {
        verifier,
        challenge,
    }
}

/// S256 transformation: base64url(sha256(verifier)), no padding.
pub fn challenge_for(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate an anti-CSRF state parameter for a login attempt.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().to_string()
}
