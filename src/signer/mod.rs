//! Request signing for S3-compatible stores
//!
//! Implements the header-based HMAC-SHA1 scheme:
//!
//! ```text
//! <METHOD>\n<contentMD5>\n<contentType>\n\n<canonHeaders>\n<resource>
//! ```
//!
//! The Date slot is always left empty because every request carries an
//! `x-amz-date` header instead, which is the only canonicalized `x-amz-*`
//! header. The signature is `base64(HMAC-SHA1(secret, stringToSign))` and the
//! header value is `AWS <accessKeyId>:<signature>`.

mod date;
mod size;

pub use date::{current_amz_date, format_amz_date, parse_amz_date, parse_gmt_date};
pub use size::{format_size, parse_size};

use crate::error::{Result, StoreError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::fmt;
use tracing::trace;

type HmacSha1 = Hmac<Sha1>;

/// HTTP verbs the store signs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Head,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Head => "HEAD",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the canonical string-to-sign
///
/// The resource is `/<bucket>/<key>`; with an empty key it is `/<bucket>/`
/// (bucket-level operations) and with an empty bucket it is `/<key>`.
pub fn string_to_sign(
    method: HttpMethod,
    content_md5: &str,
    content_type: &str,
    bucket: &str,
    key: &str,
    date: &DateTime<Utc>,
) -> String {
    let mut resource = String::with_capacity(bucket.len() + key.len() + 2);
    if !bucket.is_empty() {
        resource.push('/');
        resource.push_str(bucket);
    }
    resource.push('/');
    resource.push_str(key);

    let string_to_sign = format!(
        "{}\n{}\n{}\n\nx-amz-date:{}\n{}",
        method,
        content_md5,
        content_type,
        format_amz_date(date),
        resource
    );
    trace!("stringToSign>{}<", string_to_sign);
    string_to_sign
}

/// `base64(HMAC-SHA1(secret, string_to_sign))`
pub fn encoded_hmac(string_to_sign: &str, secret: &str) -> Result<String> {
    if secret.is_empty() {
        return Err(StoreError::Signature("empty signing key".to_string()));
    }
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| StoreError::Signature(format!("failed to generate HMAC: {}", e)))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// `AWS <key_id>:<signature>`
pub fn authorization_header(string_to_sign: &str, key_id: &str, secret: &str) -> Result<String> {
    Ok(format!(
        "AWS {}:{}",
        key_id,
        encoded_hmac(string_to_sign, secret)?
    ))
}

/// Access key pair
#[derive(Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl Credentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Credentials {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// The signed parts of one request
#[derive(Debug, Clone, Copy)]
pub struct RequestParts<'a> {
    pub method: HttpMethod,
    pub content_md5: &'a str,
    pub content_type: &'a str,
    pub bucket: &'a str,
    pub key: &'a str,
}

impl<'a> RequestParts<'a> {
    /// Request with no Content-MD5 or Content-Type
    pub fn new(method: HttpMethod, bucket: &'a str, key: &'a str) -> Self {
        RequestParts {
            method,
            content_md5: "",
            content_type: "",
            bucket,
            key,
        }
    }
}

/// Header values to stamp on a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `Authorization` value
    pub authorization: String,
    /// `x-amz-date` value; identical to the date that was signed
    pub amz_date: String,
}

/// Signs requests with one set of credentials
///
/// Shared by every backend; holds no other state.
#[derive(Debug, Clone)]
pub struct Signer {
    credentials: Credentials,
}

impl Signer {
    pub fn new(credentials: Credentials) -> Self {
        Signer { credentials }
    }

    pub fn access_key_id(&self) -> &str {
        &self.credentials.access_key_id
    }

    /// Sign `parts` as of `date`
    pub fn sign(&self, parts: &RequestParts<'_>, date: &DateTime<Utc>) -> Result<SignedHeaders> {
        let string_to_sign = string_to_sign(
            parts.method,
            parts.content_md5,
            parts.content_type,
            parts.bucket,
            parts.key,
            date,
        );
        let authorization = authorization_header(
            &string_to_sign,
            &self.credentials.access_key_id,
            &self.credentials.secret_access_key,
        )?;
        Ok(SignedHeaders {
            authorization,
            amz_date: format_amz_date(date),
        })
    }

    /// Sign `parts` as of now
    pub fn sign_now(&self, parts: &RequestParts<'_>) -> Result<SignedHeaders> {
        self.sign(parts, &Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERN: &str = "%d %b %Y %H:%M:%S";
    const SAMPLE_KEY_ID: &str = "0PN5J17HBGZHT7JJ3X82";
    const SAMPLE_SECRET: &str = "uV3F3YluFJax1cknvbcGwgjvx4QpvB+leU8dUj2o";

    fn at(text: &str) -> DateTime<Utc> {
        parse_gmt_date(text, PATTERN).unwrap()
    }

    #[test]
    fn test_get_object_vector() {
        let date = at("27 Mar 2007 19:36:42");
        let sts = string_to_sign(HttpMethod::Get, "", "", "johnsmith", "photos/puppy.jpg", &date);
        assert_eq!(
            sts,
            "GET\n\n\n\nx-amz-date:Tue, 27 Mar 2007 19:36:42 +0000\n/johnsmith/photos/puppy.jpg"
        );
        assert_eq!(
            authorization_header(&sts, SAMPLE_KEY_ID, SAMPLE_SECRET).unwrap(),
            "AWS 0PN5J17HBGZHT7JJ3X82:BsBI7E2YnNHUkJxNxhPcz+Sk6YQ="
        );
    }

    #[test]
    fn test_date_header_vector() {
        // Published vector signed with a Date header rather than x-amz-date
        let sts = "GET\n\n\nTue, 27 Mar 2007 19:36:42 +0000\n/johnsmith/photos/puppy.jpg";
        assert_eq!(
            authorization_header(sts, SAMPLE_KEY_ID, SAMPLE_SECRET).unwrap(),
            "AWS 0PN5J17HBGZHT7JJ3X82:xXjDGYUmKxnwqr5KXNPGldn5LbA="
        );

        let sts = "GET\n\n\nTue, 27 Mar 2007 19:42:41 +0000\n/johnsmith/";
        assert_eq!(
            encoded_hmac(sts, SAMPLE_SECRET).unwrap(),
            "jsRt/rhG+Vtp88HrYL706QhE4w4="
        );
    }

    #[test]
    fn test_put_with_md5_and_content_type() {
        let sts = "PUT\nc8fdb181845a4ca6b8fec737b3581d76\ntext/html\nThu, 17 Nov 2005 18:49:58 GMT\nx-amz-magic:abracadabra\nx-amz-meta-author:foo@bar.com\n/quotes/nelson";
        assert_eq!(
            authorization_header(sts, "44CF9590006BF252F707", "OtxrzxIsfpFjA7SwPzILwy8Bw21TLhquhboDYROV")
                .unwrap(),
            "AWS 44CF9590006BF252F707:jZNOcbfWmD/A/f3hSvVzXZjM2HU="
        );

        let date = at("17 Nov 2005 18:49:58");
        let sts = string_to_sign(
            HttpMethod::Put,
            "c8fdb181845a4ca6b8fec737b3581d76",
            "text/html",
            "quotes",
            "nelson",
            &date,
        );
        assert_eq!(
            sts,
            "PUT\nc8fdb181845a4ca6b8fec737b3581d76\ntext/html\n\nx-amz-date:Thu, 17 Nov 2005 18:49:58 +0000\n/quotes/nelson"
        );
        assert_eq!(
            encoded_hmac(&sts, "OtxrzxIsfpFjA7SwPzILwy8Bw21TLhquhboDYROV").unwrap(),
            "IPljiGVOvNQ6woYniU9sFxOlqBY="
        );
    }

    #[test]
    fn test_create_bucket_string() {
        let date = at("07 Sep 2011 13:58:45");
        let sts = string_to_sign(HttpMethod::Put, "", "", "test1.demo.scality.com", "", &date);
        assert_eq!(
            sts,
            "PUT\n\n\n\nx-amz-date:Wed, 07 Sep 2011 13:58:45 +0000\n/test1.demo.scality.com/"
        );
        assert_eq!(
            encoded_hmac(&sts, SAMPLE_SECRET).unwrap(),
            "bfAqZ3xceqjo+DRxC9TvfQts9xk="
        );
    }

    #[test]
    fn test_delete_string() {
        let date = at("23 Sep 2011 16:10:36");
        let sts = string_to_sign(
            HttpMethod::Delete,
            "",
            "",
            "test5.demo.scality.com",
            "5368976310281a3a81ae650108498726",
            &date,
        );
        assert_eq!(
            sts,
            "DELETE\n\n\n\nx-amz-date:Fri, 23 Sep 2011 16:10:36 +0000\n/test5.demo.scality.com/5368976310281a3a81ae650108498726"
        );
        assert_eq!(
            encoded_hmac(&sts, SAMPLE_SECRET).unwrap(),
            "RSC5Q7DEZLkeWSRc/sNaZaCgF4g="
        );
    }

    #[test]
    fn test_list_and_put_strings() {
        let date = at("03 Oct 2011 17:22:43");
        assert_eq!(
            string_to_sign(HttpMethod::Get, "", "", "test5.demo.scality.com", "", &date),
            "GET\n\n\n\nx-amz-date:Mon, 03 Oct 2011 17:22:43 +0000\n/test5.demo.scality.com/"
        );

        let date = at("08 Sep 2011 16:15:00");
        assert_eq!(
            string_to_sign(
                HttpMethod::Put,
                "",
                "text/plain",
                "nuxeo.demo.scality.com",
                "testfile3.txt",
                &date
            ),
            "PUT\n\ntext/plain\n\nx-amz-date:Thu, 08 Sep 2011 16:15:00 +0000\n/nuxeo.demo.scality.com/testfile3.txt"
        );
    }

    #[test]
    fn test_empty_bucket_resource() {
        let date = at("28 Mar 2007 01:29:59");
        let sts = string_to_sign(HttpMethod::Get, "", "", "", "", &date);
        assert!(sts.ends_with("+0000\n/"));
    }

    #[test]
    fn test_empty_secret_fails() {
        let err = encoded_hmac("GET\n\n\n\n", "").unwrap_err();
        assert!(matches!(err, StoreError::Signature(_)));
    }

    #[test]
    fn test_signer_date_matches_header() {
        let signer = Signer::new(Credentials::new(SAMPLE_KEY_ID, SAMPLE_SECRET));
        let date = at("27 Mar 2007 19:36:42");
        let parts = RequestParts::new(HttpMethod::Get, "johnsmith", "photos/puppy.jpg");
        let headers = signer.sign(&parts, &date).unwrap();
        assert_eq!(headers.amz_date, "Tue, 27 Mar 2007 19:36:42 +0000");
        assert_eq!(
            headers.authorization,
            "AWS 0PN5J17HBGZHT7JJ3X82:BsBI7E2YnNHUkJxNxhPcz+Sk6YQ="
        );
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials::new(SAMPLE_KEY_ID, SAMPLE_SECRET);
        let shown = format!("{:?}", creds);
        assert!(shown.contains(SAMPLE_KEY_ID));
        assert!(!shown.contains(SAMPLE_SECRET));
    }
}
