//! Framing and request grammar.
//!
//! Both directions carry `<ASCII header> NUL <ciphertext>`. The request
//! header is cleartext `"<username> <size>"`; everything after the NUL is
//! the encrypted payload of exactly `size` bytes. The decrypted request is
//! `"<VERB> <session> <sequence>[ <args>]" NUL [data]`, where only
//! FS_WRITEBLOCK carries data. Responses frame `"<size>"` over the
//! encrypted `"<session> <sequence>" NUL [data]`.
//!
//! Parsing is strict: one space between fields, plain decimal integers
//! with no leading zeros, and a hard ceiling on the decrypted length of
//! each verb. Anything else is answered by closing the connection.

use std::io::Read;
use std::str;

use blockfs::config::{MAX_FILE_BLOCKS, MAX_INT_DIGITS, MAX_PATHNAME, MAX_USERNAME};
use blockfs::layout::data_block::DataBlock;
use blockfs::typ::file_type::FileKind;
use blockfs::typ::request::{Op, Reply, Request};

use crate::crypto::ENVELOPE_OVERHEAD;

/// Header bytes before the NUL: name, one space, decimal length.
const MAX_HEADER: usize = MAX_USERNAME + 1 + MAX_INT_DIGITS;

// Decrypted-length ceiling per verb: the verb word, two integers, and for
// the path-carrying verbs the path, plus separators, the NUL, and for
// WRITEBLOCK one raw block.
const PREFIX_MAX: usize = 1 + MAX_INT_DIGITS + 1 + MAX_INT_DIGITS;
const SESSION_CLEAR_MAX: usize = 10 + PREFIX_MAX + 1;
const CREATE_CLEAR_MAX: usize = 9 + PREFIX_MAX + 1 + MAX_PATHNAME + 2 + 1;
const DELETE_CLEAR_MAX: usize = 9 + PREFIX_MAX + 1 + MAX_PATHNAME + 1;
const READ_CLEAR_MAX: usize = 12 + PREFIX_MAX + 1 + MAX_PATHNAME + 1 + MAX_INT_DIGITS + 1;
const WRITE_CLEAR_MAX: usize =
    12 + PREFIX_MAX + 1 + MAX_PATHNAME + 1 + MAX_INT_DIGITS + 1 + blockfs::config::BLOCK_SIZE;

/// Largest ciphertext any header may announce.
pub const MAX_CIPHERTEXT: usize = WRITE_CLEAR_MAX + ENVELOPE_OVERHEAD;

/// Strict decimal: digits only, no sign, no leading zero unless the value
/// is zero itself, and it must fit a `u32`.
pub fn parse_uint(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() || bytes.len() > MAX_INT_DIGITS {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == b'0' {
        return None;
    }
    let mut value: u64 = 0;
    for &b in bytes {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u64::from(b - b'0');
    }
    u32::try_from(value).ok()
}

/// Read the request header one byte at a time up to its NUL. None on a
/// closed connection, an overlong header, or a malformed one.
pub fn read_header(stream: &mut impl Read) -> Option<(String, usize)> {
    let mut raw = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        stream.read_exact(&mut byte).ok()?;
        if byte[0] == 0 {
            break;
        }
        raw.push(byte[0]);
        if raw.len() > MAX_HEADER {
            return None;
        }
    }
    parse_header(&raw)
}

fn parse_header(raw: &[u8]) -> Option<(String, usize)> {
    if raw.iter().filter(|&&b| b == b' ').count() != 1 {
        return None;
    }
    let text = str::from_utf8(raw).ok()?;
    let (user, size) = text.split_once(' ')?;
    if user.is_empty() || user.len() > MAX_USERNAME {
        return None;
    }
    let size = parse_uint(size.as_bytes())? as usize;
    if size == 0 || size > MAX_CIPHERTEXT {
        return None;
    }
    Some((user.to_string(), size))
}

pub fn read_body(stream: &mut impl Read, len: usize) -> Option<Vec<u8>> {
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).ok()?;
    Some(buf)
}

/// Parse a decrypted request payload. `user` comes from the header; the
/// payload only carries the verb, the two counters, and the arguments.
pub fn parse_request(user: &str, clear: &[u8]) -> Option<Request> {
    let nul = clear.iter().position(|&b| b == 0)?;
    let (text, data) = (&clear[..nul], &clear[nul + 1..]);
    let text = str::from_utf8(text).ok()?;

    let mut fields = text.splitn(4, ' ');
    let verb = fields.next()?;
    let cap = match verb {
        "FS_SESSION" => SESSION_CLEAR_MAX,
        "FS_CREATE" => CREATE_CLEAR_MAX,
        "FS_DELETE" => DELETE_CLEAR_MAX,
        "FS_READBLOCK" => READ_CLEAR_MAX,
        "FS_WRITEBLOCK" => WRITE_CLEAR_MAX,
        _ => return None,
    };
    if clear.len() > cap {
        return None;
    }
    let session = parse_uint(fields.next()?.as_bytes())?;
    let sequence = parse_uint(fields.next()?.as_bytes())?;
    let args = fields.next();

    let op = match verb {
        "FS_SESSION" => {
            if args.is_some() || !data.is_empty() {
                return None;
            }
            Op::Session
        }
        "FS_READBLOCK" => {
            let (path, offset) = path_and_block(args?)?;
            if !data.is_empty() {
                return None;
            }
            Op::ReadBlock { path, offset }
        }
        "FS_WRITEBLOCK" => {
            let (path, offset) = path_and_block(args?)?;
            let block: &DataBlock = data.try_into().ok()?;
            Op::WriteBlock {
                path,
                offset,
                data: Box::new(*block),
            }
        }
        "FS_CREATE" => {
            let (path, kind) = args?.split_once(' ')?;
            let path = bounded_path(path)?;
            let kind = match kind {
                "f" => FileKind::File,
                "d" => FileKind::Dir,
                _ => return None,
            };
            if !data.is_empty() {
                return None;
            }
            Op::Create { path, kind }
        }
        "FS_DELETE" => {
            let path = bounded_path(args?)?;
            if !data.is_empty() {
                return None;
            }
            Op::Delete { path }
        }
        _ => unreachable!(),
    };

    Some(Request {
        user: user.to_string(),
        session,
        sequence,
        op,
    })
}

fn path_and_block(args: &str) -> Option<(String, u32)> {
    let (path, number) = args.split_once(' ')?;
    let path = bounded_path(path)?;
    let offset = parse_uint(number.as_bytes())?;
    if offset as usize >= MAX_FILE_BLOCKS {
        return None;
    }
    Some((path, offset))
}

/// Length and charset only; the engine validates path structure.
fn bounded_path(path: &str) -> Option<String> {
    if path.is_empty() || path.len() > MAX_PATHNAME {
        return None;
    }
    if path.bytes().any(|b| b == 0 || b.is_ascii_whitespace()) {
        return None;
    }
    Some(path.to_string())
}

/// Cleartext of a response: the counters, a NUL, and for READ one block.
pub fn encode_reply(session: u32, sequence: u32, reply: &Reply) -> Vec<u8> {
    let mut clear = format!("{} {}", session, sequence).into_bytes();
    clear.push(0);
    if let Reply::Data(data) = reply {
        clear.extend_from_slice(&data[..]);
    }
    clear
}

/// Prepend the `"<size>" NUL` header to a sealed payload.
pub fn frame(ciphertext: &[u8]) -> Vec<u8> {
    let mut out = ciphertext.len().to_string().into_bytes();
    out.push(0);
    out.extend_from_slice(ciphertext);
    out
}
