//! Request signing
//!
//! The platform expects every API call to carry session cookies, trace ids and
//! a signature computed by its web client. The signature algorithm itself is
//! out of scope here: [`CommandSigner`] hands the request to an external
//! program and attaches whatever headers it returns.

use crate::provider::{ProviderError, ProviderResult};
use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use tokio::process::Command;

/// What a signer needs to know about a request
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    /// API path including the query string (e.g. `/api/sns/web/v1/user_posted?num=30`)
    pub api_path: &'a str,

    /// Serialized JSON body for POST requests
    pub body: Option<&'a str>,

    /// `GET` or `POST`
    pub method: &'a str,
}

/// Headers to attach to a signed request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedRequest {
    pub headers: Vec<(String, String)>,
}

impl SignedRequest {
    /// Looks up a header value by (case-insensitive) name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Produces the headers for one API request
///
/// Built once at startup and shared for the whole process.
#[async_trait]
pub trait RequestSigner: Send + Sync {
    async fn sign(&self, input: &SigningInput<'_>) -> ProviderResult<SignedRequest>;
}

/// Attaches session cookies and fresh trace ids, without a signature
#[derive(Debug, Clone)]
pub struct CookieSigner {
    cookies: Vec<(String, String)>,
    web_origin: String,
}

impl CookieSigner {
    /// Creates a signer from a raw `name=value; name2=value2` cookie string
    pub fn new(cookie_string: &str, web_origin: impl Into<String>) -> Self {
        Self {
            cookies: parse_cookie_string(cookie_string),
            web_origin: web_origin.into(),
        }
    }

    /// Value of one session cookie
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn base_headers(&self) -> Vec<(String, String)> {
        let cookie_header = self
            .cookies
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ");
        let origin = self.web_origin.trim_end_matches('/');

        vec![
            ("accept".to_string(), "application/json, text/plain, */*".to_string()),
            ("content-type".to_string(), "application/json;charset=UTF-8".to_string()),
            ("origin".to_string(), origin.to_string()),
            ("referer".to_string(), format!("{}/", origin)),
            ("x-b3-traceid".to_string(), trace_id(16)),
            ("cookie".to_string(), cookie_header),
        ]
    }
}

#[async_trait]
impl RequestSigner for CookieSigner {
    async fn sign(&self, _input: &SigningInput<'_>) -> ProviderResult<SignedRequest> {
        Ok(SignedRequest {
            headers: self.base_headers(),
        })
    }
}

/// Delegates signature computation to an external program
///
/// The program is invoked as `<command...> <api_path> <body> <a1 cookie> <method>`
/// and must print `{"xs": "...", "xt": ..., "xs_common": "..."}` on stdout.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    cookies: CookieSigner,
    program: String,
    args: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SignatureOutput {
    xs: String,
    xt: serde_json::Value,
    #[serde(default)]
    xs_common: String,
}

impl CommandSigner {
    /// Creates a signer from a command line (`program` followed by fixed args)
    pub fn new(cookies: CookieSigner, command: &[String]) -> ProviderResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ProviderError::Sign("signer command is empty".to_string()))?;
        Ok(Self {
            cookies,
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl RequestSigner for CommandSigner {
    async fn sign(&self, input: &SigningInput<'_>) -> ProviderResult<SignedRequest> {
        let a1 = self.cookies.cookie("a1").unwrap_or_default();

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(input.api_path)
            .arg(input.body.unwrap_or_default())
            .arg(a1)
            .arg(input.method)
            .output()
            .await
            .map_err(|e| ProviderError::Sign(format!("failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            return Err(ProviderError::Sign(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let signature: SignatureOutput = serde_json::from_slice(&output.stdout)
            .map_err(|e| ProviderError::Sign(format!("unreadable signer output: {}", e)))?;

        let xt = match signature.xt {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };

        let mut headers = self.cookies.base_headers();
        headers.push(("x-s".to_string(), signature.xs));
        headers.push(("x-t".to_string(), xt));
        headers.push(("x-s-common".to_string(), signature.xs_common));

        Ok(SignedRequest { headers })
    }
}

/// Splits a raw cookie header into name/value pairs
fn parse_cookie_string(raw: &str) -> Vec<(String, String)> {
    raw.split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            let (name, value) = pair.split_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

fn trace_id(len: usize) -> String {
    const HEX: &[u8] = b"abcdef0123456789";
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}
