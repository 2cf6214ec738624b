use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

use crate::config::Settings;

/// Claims carried by a sync token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Claims {
	pub sub: String,
	pub exp: u64,
	#[serde(default)]
	pub iat: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub iss: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub aud: Option<String>,
}

/// Identity admitted by the gate. `subject` is set only for verified tokens;
/// shared-secret callers are anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
	pub subject: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
	#[error("missing credential")]
	Missing,

	#[error("invalid credential")]
	Invalid,

	#[error("token rejected: {0}")]
	Token(#[from] jsonwebtoken::errors::Error),

	#[error("no shared secret or token secret configured")]
	Unconfigured,
}

/// HS256 token signer and verifier.
pub struct TokenVerifier {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
	issuer: Option<String>,
	audience: Option<String>,
}

impl TokenVerifier {
	pub fn new(secret: &str, issuer: Option<String>, audience: Option<String>) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);
		if let Some(iss) = &issuer {
			validation.set_issuer(&[iss]);
		}
		match &audience {
			Some(aud) => validation.set_audience(&[aud]),
			None => validation.validate_aud = false,
		}

		Self {
			encoding: EncodingKey::from_secret(secret.as_bytes()),
			decoding: DecodingKey::from_secret(secret.as_bytes()),
			validation,
			issuer,
			audience,
		}
	}

	/// Build a verifier from settings, or `None` when no JWT secret is set.
	pub fn from_settings(settings: &Settings) -> Option<Self> {
		settings.jwt_secret.as_deref().map(|secret| {
			Self::new(
				secret,
				settings.jwt_issuer.clone(),
				settings.jwt_audience.clone(),
			)
		})
	}

	/// Validate signature, expiry and the configured issuer/audience.
	pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
		let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
		debug!("token validated for subject: {}", data.claims.sub);
		Ok(data.claims)
	}

	/// Sign a token for `subject` valid for `ttl`.
	pub fn issue(&self, subject: &str, ttl: Duration) -> Result<String, AuthError> {
		let iat = Utc::now().timestamp().max(0) as u64;
		let claims = Claims {
			sub: subject.to_string(),
			exp: iat + ttl.as_secs(),
			iat,
			iss: self.issuer.clone(),
			aud: self.audience.clone(),
		};
		Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
	}
}

/// Admits or rejects a call before any store access.
///
/// A credential equal to the shared secret is admitted without a subject.
/// Anything else must be a valid token, whose `sub` becomes the subject.
pub struct AuthGate {
	shared_secret: Option<[u8; 32]>,
	tokens: Option<TokenVerifier>,
}

fn digest(value: &str) -> [u8; 32] {
	Sha256::digest(value.as_bytes()).into()
}

/// Compare digests without short-circuiting on the first differing byte.
fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
	a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl AuthGate {
	pub fn new(shared_secret: Option<&str>, tokens: Option<TokenVerifier>) -> Self {
		Self {
			shared_secret: shared_secret.map(digest),
			tokens,
		}
	}

	pub fn from_settings(settings: &Settings) -> Result<Self, AuthError> {
		let gate = Self::new(
			settings.password.as_deref(),
			TokenVerifier::from_settings(settings),
		);
		if gate.shared_secret.is_none() && gate.tokens.is_none() {
			return Err(AuthError::Unconfigured);
		}
		Ok(gate)
	}

	pub fn check(&self, credential: Option<&str>) -> Result<Principal, AuthError> {
		let credential = credential.filter(|c| !c.is_empty()).ok_or(AuthError::Missing)?;

		if let Some(expected) = &self.shared_secret {
			if digests_match(expected, &digest(credential)) {
				return Ok(Principal::default());
			}
		}

		match &self.tokens {
			Some(verifier) => {
				let claims = verifier.verify(credential)?;
				Ok(Principal {
					subject: Some(claims.sub),
				})
			}
			None => Err(AuthError::Invalid),
		}
	}
}
