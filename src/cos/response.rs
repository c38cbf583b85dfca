//! Decoding of COS XML envelopes
//!
//! Success statuses are operation specific. Anything else is decoded as an
//! `Error` envelope; a body that cannot be decoded is reported as
//! [`CosError::MalformedResponse`] rather than as a blank service error.

use crate::cos::error::{CosError, Result, ServiceError};
use crate::cos::types::{BucketInfo, ListBucketsResponse};
use bytes::Bytes;
use hyper::StatusCode;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Return the body when `status` is accepted, otherwise decode the error envelope
pub fn ensure_success(status: StatusCode, body: Bytes, accepted: &[StatusCode]) -> Result<Bytes> {
    if accepted.contains(&status) {
        Ok(body)
    } else {
        Err(decode_error(status.as_u16(), &body))
    }
}

/// Decode a failure response into [`CosError::Service`] or [`CosError::MalformedResponse`]
pub fn decode_error(status: u16, body: &[u8]) -> CosError {
    let mut code = None;
    let mut err = ServiceError {
        http_status_code: status,
        error_code: String::new(),
        message: String::new(),
        resource_url: String::new(),
        request_id: String::new(),
        trace_id: String::new(),
    };

    let root = walk_elements(body, |path, text| {
        match path {
            ["Error", "Code"] => code = Some(text),
            ["Error", "Message"] => err.message = text,
            ["Error", "Resource"] => err.resource_url = text,
            ["Error", "RequestId"] => err.request_id = text,
            ["Error", "TraceId"] => err.trace_id = text,
            _ => {}
        }
        Ok(())
    });

    match root {
        Ok(Some(root)) if root == "Error" => match code {
            Some(code) => {
                err.error_code = code;
                CosError::Service(err)
            }
            None => CosError::MalformedResponse(format!(
                "HTTP {}: error envelope has no Code element",
                status
            )),
        },
        Ok(Some(root)) => CosError::MalformedResponse(format!(
            "HTTP {}: expected Error element, found {}",
            status, root
        )),
        Ok(None) => CosError::MalformedResponse(format!(
            "HTTP {}: response body has no XML document",
            status
        )),
        Err(reason) => CosError::MalformedResponse(format!("HTTP {}: {}", status, reason)),
    }
}

#[derive(Default)]
struct PartialBucket {
    name: Option<String>,
    location: Option<String>,
    creation_date: Option<String>,
}

/// Decode the GET Service (list buckets) body
pub fn decode_list_buckets(body: &[u8]) -> Result<ListBucketsResponse> {
    let mut response = ListBucketsResponse::default();
    let mut current = PartialBucket::default();
    let mut saw_buckets = false;

    let root = walk_elements(body, |path, text| {
        match path {
            [_, "Owner", "ID"] => response.owner_id = Some(text),
            [_, "Owner", "DisplayName"] => response.owner_display_name = Some(text),
            [_, "Buckets"] => saw_buckets = true,
            [_, "Buckets", "Bucket", "Name"] => current.name = Some(text),
            [_, "Buckets", "Bucket", "Location"] => current.location = Some(text),
            [_, "Buckets", "Bucket", "CreationDate"] => current.creation_date = Some(text),
            [_, "Buckets", "Bucket"] => {
                let bucket = std::mem::take(&mut current);
                response.buckets.push(finish_bucket(bucket)?);
            }
            _ => {}
        }
        Ok(())
    })
    .map_err(CosError::MalformedResponse)?;

    if root.is_none() {
        return Err(CosError::MalformedResponse(
            "bucket listing has no XML document".to_string(),
        ));
    }
    if !saw_buckets {
        return Err(CosError::MalformedResponse(
            "bucket listing has no Buckets element".to_string(),
        ));
    }

    Ok(response)
}

fn finish_bucket(bucket: PartialBucket) -> std::result::Result<BucketInfo, String> {
    let full_name = bucket.name.ok_or("Bucket entry has no Name")?;
    let region = bucket
        .location
        .ok_or_else(|| format!("bucket {} has no Location", full_name))?;
    let (name, app_id) = split_bucket_name(&full_name)?;

    Ok(BucketInfo {
        name: name.to_string(),
        app_id: app_id.to_string(),
        region,
        creation_date: bucket.creation_date,
    })
}

/// Split `{name}-{app_id}` on the last hyphen.
///
/// Names that do not follow this convention are rejected, never guessed.
pub fn split_bucket_name(full_name: &str) -> std::result::Result<(&str, &str), String> {
    match full_name.rsplit_once('-') {
        Some((name, app_id)) if !name.is_empty() && !app_id.is_empty() => Ok((name, app_id)),
        _ => Err(format!(
            "bucket name {:?} does not match <name>-<appid>",
            full_name
        )),
    }
}

/// Stream through `body`, calling `on_end` with the element path and text of
/// every closed element (self-closing elements included).
///
/// Returns the root element name, or `None` when the body holds no element.
/// Non-whitespace text outside the root element makes the body malformed.
fn walk_elements<F>(body: &[u8], mut on_end: F) -> std::result::Result<Option<String>, String>
where
    F: FnMut(&[&str], String) -> std::result::Result<(), String>,
{
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut root: Option<String> = None;
    let mut stack: Vec<String> = Vec::with_capacity(8);
    let mut text = String::with_capacity(64);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if stack.is_empty() && root.is_some() {
                    return Err("multiple root elements".to_string());
                }
                root.get_or_insert_with(|| name.clone());
                stack.push(name);
                text.clear();
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if stack.is_empty() && root.is_some() {
                    return Err("multiple root elements".to_string());
                }
                root.get_or_insert_with(|| name.clone());
                stack.push(name);
                let path: Vec<&str> = stack.iter().map(String::as_str).collect();
                on_end(&path, String::new())?;
                stack.pop();
                text.clear();
            }
            Ok(Event::Text(e)) => {
                let unescaped = e
                    .unescape()
                    .map_err(|e| format!("XML parse error: {}", e))?;
                if stack.is_empty() {
                    if !unescaped.trim().is_empty() {
                        return Err("unexpected text outside of root element".to_string());
                    }
                } else {
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(e)) => {
                if stack.is_empty() {
                    return Err("unexpected CDATA outside of root element".to_string());
                }
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                let path: Vec<&str> = stack.iter().map(String::as_str).collect();
                on_end(&path, std::mem::take(&mut text))?;
                stack.pop();
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("XML parse error: {}", e)),
        }
    }

    if !stack.is_empty() {
        return Err(format!("unexpected end of document inside <{}>", stack.join("/")));
    }

    Ok(root)
}
